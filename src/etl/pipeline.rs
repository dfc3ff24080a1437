//! Concurrent box-score loader.
//!
//! Dates go into a shared queue that a fixed pool of workers drains. Each
//! worker fetches one date (rate limiting and retries live in the client),
//! flattens it and writes it in a single transaction. Dates that fail are
//! deferred, not fatal: once the first pass drains, the deferred dates get
//! one more pass through the same pool. Whatever fails twice is reported.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{info, instrument, warn};

use crate::api::StatsApi;
use crate::db::store::Store;
use crate::etl::transform::flatten_box_scores;
use crate::monitoring::progress::Progress;

/// Outcome of one pass over a set of dates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassOutcome {
    pub succeeded: u64,
    pub rows_inserted: u64,
    pub failed: Vec<NaiveDate>,
}

impl PassOutcome {
    fn merge(&mut self, other: PassOutcome) {
        self.succeeded += other.succeeded;
        self.rows_inserted += other.rows_inserted;
        self.failed.extend(other.failed);
    }
}

/// Totals for a whole pipeline run (both passes).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineReport {
    pub dates_total: u64,
    pub dates_loaded: u64,
    pub rows_inserted: u64,
    pub deferred: u64,
    pub recovered: u64,
    /// Dates that failed in both passes, oldest first.
    pub failed: Vec<NaiveDate>,
}

impl PipelineReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "=== Box Score Load ===\n\
             Dates: {} loaded / {} total\n\
             Rows inserted: {}\n\
             Deferred after first pass: {} ({} recovered)\n\
             Failed: {}",
            self.dates_loaded,
            self.dates_total,
            self.rows_inserted,
            self.deferred,
            self.recovered,
            self.failed.len(),
        )?;
        if !self.failed.is_empty() {
            let dates: Vec<String> = self.failed.iter().map(|d| d.to_string()).collect();
            write!(f, " [{}]", dates.join(", "))?;
        }
        Ok(())
    }
}

pub struct BoxScorePipeline {
    api: Arc<dyn StatsApi>,
    store: Store,
    workers: usize,
}

impl BoxScorePipeline {
    pub fn new(api: Arc<dyn StatsApi>, store: Store, workers: usize) -> Self {
        Self {
            api,
            store,
            workers: workers.max(1),
        }
    }

    /// Load every date, then retry the ones that failed once.
    #[instrument(skip(self, dates), fields(dates = dates.len(), workers = self.workers))]
    pub async fn run(&self, dates: Vec<NaiveDate>) -> Result<PipelineReport> {
        let dates_total = dates.len() as u64;
        info!(dates = dates_total, "Processing dates");

        let first = self.run_pass("box_scores", dates).await?;

        let mut report = PipelineReport {
            dates_total,
            dates_loaded: first.succeeded,
            rows_inserted: first.rows_inserted,
            deferred: first.failed.len() as u64,
            ..PipelineReport::default()
        };

        if first.failed.is_empty() {
            info!(rows = report.rows_inserted, "All dates loaded on first pass");
            return Ok(report);
        }

        warn!(deferred = report.deferred, "Reprocessing failed dates");
        let mut retry_dates = first.failed;
        retry_dates.sort();

        let second = self.run_pass("reprocess", retry_dates).await?;

        report.dates_loaded += second.succeeded;
        report.rows_inserted += second.rows_inserted;
        report.recovered = second.succeeded;
        report.failed = second.failed;
        report.failed.sort();

        if !report.failed.is_empty() {
            warn!(failed = report.failed.len(), "Dates still failing after reprocessing");
        }
        Ok(report)
    }

    /// Drain `dates` with the worker pool. Each date is attempted exactly once.
    async fn run_pass(&self, label: &str, dates: Vec<NaiveDate>) -> Result<PassOutcome> {
        let progress = Arc::new(Progress::new(label, dates.len() as u64));
        let queue = Arc::new(Mutex::new(VecDeque::from(dates)));
        let worker_count = self.workers;

        let mut workers = JoinSet::new();
        for worker_id in 0..worker_count {
            let queue = queue.clone();
            let progress = progress.clone();
            let api = self.api.clone();
            let store = self.store.clone();
            workers.spawn(async move { worker(worker_id, queue, api, store, progress).await });
        }

        let mut outcome = PassOutcome::default();
        while let Some(joined) = workers.join_next().await {
            let worker_outcome = joined.context("Box score worker panicked")?;
            outcome.merge(worker_outcome);
        }

        info!(
            pass = label,
            succeeded = outcome.succeeded,
            failed = outcome.failed.len(),
            rows = outcome.rows_inserted,
            "Pass complete"
        );
        Ok(outcome)
    }
}

async fn worker(
    worker_id: usize,
    queue: Arc<Mutex<VecDeque<NaiveDate>>>,
    api: Arc<dyn StatsApi>,
    store: Store,
    progress: Arc<Progress>,
) -> PassOutcome {
    let mut outcome = PassOutcome::default();

    loop {
        // Hold the lock only long enough to pop.
        let next = queue.lock().await.pop_front();
        let Some(date) = next else { break };

        match load_date(api.as_ref(), &store, date).await {
            Ok(rows) => {
                outcome.succeeded += 1;
                outcome.rows_inserted += rows;
            }
            Err(e) => {
                warn!(worker = worker_id, date = %date, error = %format!("{e:#}"), "Error processing date");
                outcome.failed.push(date);
            }
        }
        progress.tick();
    }

    outcome
}

/// Fetch, flatten and store a single date. Returns the number of new rows.
pub async fn load_date(api: &dyn StatsApi, store: &Store, date: NaiveDate) -> Result<u64> {
    let games = api
        .box_scores(date)
        .await
        .with_context(|| format!("Failed to fetch box scores for {date}"))?;

    let batch = flatten_box_scores(date, &games);
    if batch.is_empty() {
        return Ok(0);
    }

    store
        .insert_box_score_batch(&batch)
        .await
        .with_context(|| format!("Failed to store box scores for {date}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_display_lists_failures() {
        let report = PipelineReport {
            dates_total: 3,
            dates_loaded: 2,
            rows_inserted: 40,
            deferred: 2,
            recovered: 1,
            failed: vec![NaiveDate::from_ymd_opt(2019, 2, 14).unwrap()],
        };
        let text = report.to_string();
        assert!(text.contains("2 loaded / 3 total"));
        assert!(text.contains("Failed: 1 [2019-02-14]"));
        assert!(!report.is_complete());
    }

    #[test]
    fn test_pass_outcome_merge() {
        let day = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let mut total = PassOutcome::default();
        total.merge(PassOutcome {
            succeeded: 2,
            rows_inserted: 10,
            failed: vec![],
        });
        total.merge(PassOutcome {
            succeeded: 1,
            rows_inserted: 5,
            failed: vec![day],
        });
        assert_eq!(total.succeeded, 3);
        assert_eq!(total.rows_inserted, 15);
        assert_eq!(total.failed, vec![day]);
    }
}
