//! Result of a finished drain

use serde::{Deserialize, Serialize};

use crate::metrics::RunMetrics;
use crate::page::Record;
use crate::worker::FetchStats;

/// Everything a run produced
///
/// `records` is in arrival order, which differs from page order and is not
/// reproducible between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchReport {
    /// When the run started
    pub started_at: chrono::DateTime<chrono::Utc>,

    /// Collected records
    pub records: Vec<Record>,

    /// Timing and throughput
    pub metrics: RunMetrics,

    /// Page counters
    pub stats: FetchStats,
}

impl FetchReport {
    /// Number of collected records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if nothing was collected
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Check if a failure may have cut the collection short
    pub fn is_truncated(&self) -> bool {
        self.stats.is_truncated()
    }

    /// Take the records, discarding metrics
    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}
