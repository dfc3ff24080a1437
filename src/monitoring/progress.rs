//! Progress reporting for long-running loads.
//!
//! Logs a line roughly every tenth of the way through a known total,
//! or every `UNBOUNDED_STEP` items when the total is unknown.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::info;

const UNBOUNDED_STEP: u64 = 10;

#[derive(Debug)]
pub struct Progress {
    label: String,
    total: Option<u64>,
    done: AtomicU64,
}

impl Progress {
    pub fn new(label: impl Into<String>, total: u64) -> Self {
        Self {
            label: label.into(),
            total: Some(total),
            done: AtomicU64::new(0),
        }
    }

    /// A counter for work whose size is only known at the end (cursor paging).
    pub fn unbounded(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            total: None,
            done: AtomicU64::new(0),
        }
    }

    /// Record one finished item. Returns the new count.
    pub fn tick(&self) -> u64 {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        if self.should_report(done) {
            match self.total {
                Some(total) => info!(
                    label = %self.label,
                    done,
                    total,
                    pct = done * 100 / total.max(1),
                    "Progress"
                ),
                None => info!(label = %self.label, done, "Progress"),
            }
        }
        done
    }

    pub fn done(&self) -> u64 {
        self.done.load(Ordering::Relaxed)
    }

    fn should_report(&self, done: u64) -> bool {
        match self.total {
            Some(0) => false,
            Some(total) => {
                let step = (total / 10).max(1);
                done % step == 0 || done == total
            }
            None => done % UNBOUNDED_STEP == 0,
        }
    }
}
