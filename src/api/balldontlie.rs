//! balldontlie v1 REST client.
//!
//! Wraps `reqwest` with a shared rate limiter and bounded exponential
//! backoff. One client is shared by every pipeline worker, so the limiter
//! caps the whole process rather than each worker.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::header::AUTHORIZATION;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::api::models::{AdvancedStat, BoxScoreGame, Page, Player, Team};
use crate::api::{ApiError, StatsApi};
use crate::config::{AppConfig, RateLimitConfig, RetryConfig};

type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

pub struct BallDontLieClient {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    per_page: u32,
    retry: RetryConfig,
    limiter: Arc<Limiter>,
}

impl BallDontLieClient {
    pub fn new(config: &AppConfig, api_key: SecretString) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: config.api.base_url.trim_end_matches('/').to_string(),
            api_key,
            per_page: config.api.per_page,
            retry: config.retry.clone(),
            limiter: create_rate_limiter(&config.rate_limit),
        })
    }

    /// GET `{base_url}/{endpoint}` and decode the body, retrying transient failures.
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = format!("{}/{endpoint}", self.base_url);
        let url = url.as_str();

        self.with_retry(endpoint, || async move {
            self.rate_limit().await;

            let resp = self
                .http
                .get(url)
                .header(AUTHORIZATION, self.api_key.expose_secret())
                .query(query)
                .send()
                .await?;

            let status = resp.status();
            let body = resp.text().await?;

            if !status.is_success() {
                return Err(ApiError::Status { status, body });
            }

            serde_json::from_str(&body).map_err(|source| ApiError::Decode {
                endpoint: endpoint.to_string(),
                source,
            })
        })
        .await
    }

    async fn rate_limit(&self) {
        self.limiter.until_ready().await;
    }

    async fn with_retry<F, Fut, T>(&self, endpoint: &str, operation: F) -> Result<T, ApiError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, ApiError>>,
    {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) if attempt >= max_attempts => {
                    warn!(endpoint, attempts = attempt, error = %e, "Giving up after retries");
                    return Err(e);
                }
                Err(e) => {
                    let backoff = backoff_delay(attempt, &self.retry);
                    warn!(
                        endpoint,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Retrying after transient failure"
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

#[async_trait]
impl StatsApi for BallDontLieClient {
    #[instrument(skip(self))]
    async fn teams(&self) -> Result<Vec<Team>, ApiError> {
        let page: Page<Team> = self.get_json("teams", &[]).await?;
        debug!(count = page.data.len(), "Teams fetched");
        Ok(page.data)
    }

    #[instrument(skip(self))]
    async fn players_page(&self, cursor: Option<&str>) -> Result<Page<Player>, ApiError> {
        let mut query = vec![("per_page", self.per_page.to_string())];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }
        self.get_json("players", &query).await
    }

    #[instrument(skip(self))]
    async fn advanced_stats_page(
        &self,
        season: i32,
        cursor: Option<&str>,
    ) -> Result<Page<AdvancedStat>, ApiError> {
        let mut query = vec![
            ("seasons[]", season.to_string()),
            ("per_page", self.per_page.to_string()),
        ];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }
        self.get_json("stats/advanced", &query).await
    }

    #[instrument(skip(self))]
    async fn box_scores(&self, date: NaiveDate) -> Result<Vec<BoxScoreGame>, ApiError> {
        let query = [("date", date.format("%Y-%m-%d").to_string())];
        let page: Page<BoxScoreGame> = self.get_json("box_scores", &query).await?;
        Ok(page.data)
    }
}

// === Helper Functions ===

fn create_rate_limiter(config: &RateLimitConfig) -> Arc<Limiter> {
    let rpm = NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN);
    let burst = NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::MIN);

    let quota = Quota::per_minute(rpm).allow_burst(burst);
    Arc::new(RateLimiter::direct(quota))
}

/// Delay before retry number `attempt` (1-based): 2^(attempt-1) seconds,
/// clamped into `[backoff_min_ms, backoff_max_ms]`.
pub fn backoff_delay(attempt: u32, retry: &RetryConfig) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    let raw_ms = 1000u64.saturating_mul(1u64 << exponent);
    let max_ms = retry.backoff_max_ms.max(retry.backoff_min_ms);
    Duration::from_millis(raw_ms.clamp(retry.backoff_min_ms, max_ms))
}
