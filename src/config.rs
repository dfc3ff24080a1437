use std::path::Path;

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub rate_limit: RateLimitConfig,
    pub retry: RetryConfig,
    pub pipeline: PipelineConfig,
    pub database: DatabaseConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub per_page: u32,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
    pub burst_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per request, the first one included.
    pub max_attempts: u32,
    pub backoff_min_ms: u64,
    pub backoff_max_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    pub workers: usize,
    pub seasons: Vec<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

impl DatabaseConfig {
    pub fn url(&self) -> String {
        format!("sqlite:{}", self.path)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    pub log_level: String,
}

/// Secrets loaded exclusively from environment variables.
/// Not serializable, not stored in config files.
pub struct Secrets {
    pub api_key: Option<SecretString>,
}

impl Secrets {
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("API_KEY").ok().map(SecretString::from),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file, overlaying environment variables.
    pub fn load(config_path: &Path) -> Result<(Self, Secrets)> {
        dotenvy::dotenv().ok();

        let contents = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        if let Ok(path) = std::env::var("DATABASE_PATH") {
            config.database.path = path;
        }

        let secrets = Secrets::from_env();

        Ok((config, secrets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_config() {
        let contents = std::fs::read_to_string(DEFAULT_CONFIG_PATH)
            .expect("config/default.toml should exist");
        let config: AppConfig = toml::from_str(&contents).expect("should parse");
        assert_eq!(config.api.base_url, "https://api.balldontlie.io/v1");
        assert_eq!(config.api.per_page, 100);
        assert_eq!(config.rate_limit.requests_per_minute, 300);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.backoff_min_ms, 4000);
        assert_eq!(config.retry.backoff_max_ms, 10000);
        assert_eq!(config.pipeline.workers, 4);
        assert_eq!(config.pipeline.seasons.first(), Some(&2014));
        assert_eq!(config.pipeline.seasons.last(), Some(&2022));
    }

    #[test]
    fn test_database_url() {
        let db = DatabaseConfig {
            path: "test.db".to_string(),
        };
        assert_eq!(db.url(), "sqlite:test.db");
    }

    #[test]
    fn test_missing_section_is_rejected() {
        let result: Result<AppConfig, _> = toml::from_str("[api]\nbase_url = \"x\"\n");
        assert!(result.is_err());
    }
}
