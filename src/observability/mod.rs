//! Structured logging and run metrics.
//!
//! This module provides:
//! - [`init_logging`] for one-time subscriber setup with `RUST_LOG` support
//! - [`RunMetrics`], counters and timings collected during a labeling run

use std::time::Duration;

use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Initialize structured logging with `RUST_LOG` environment variable support.
///
/// Defaults to `hierlabel=info` when `RUST_LOG` is not set. Output goes to
/// stderr so that stdout stays usable for generated text. Subsequent calls
/// are ignored.
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hierlabel=info"));

    // try_init so double-init in tests doesn't panic
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}

/// Counters for one labeling or reverse-values run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunMetrics {
    pub records_fetched: usize,
    pub assignments: usize,
    pub unlabeled: usize,
    pub batches: usize,
    pub records_updated: usize,
    pub fetch_duration_ms: Option<u64>,
    pub traversal_duration_ms: Option<u64>,
    pub write_duration_ms: Option<u64>,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "records_fetched": self.records_fetched,
            "assignments": self.assignments,
            "unlabeled": self.unlabeled,
            "batches": self.batches,
            "records_updated": self.records_updated,
            "fetch_duration_ms": self.fetch_duration_ms,
            "traversal_duration_ms": self.traversal_duration_ms,
            "write_duration_ms": self.write_duration_ms,
            "total_duration_ms": self.total_duration_ms(),
        })
    }

    /// Sum of every recorded phase.
    pub fn total_duration_ms(&self) -> u64 {
        [
            self.fetch_duration_ms,
            self.traversal_duration_ms,
            self.write_duration_ms,
        ]
        .into_iter()
        .flatten()
        .sum()
    }
}

/// Milliseconds, saturating at `u64::MAX`.
pub fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
