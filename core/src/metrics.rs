//! Run timing and throughput metrics

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Records per notional request when normalizing throughput.
///
/// Independent of the remote's actual page size.
pub const ITEMS_PER_REQUEST: f64 = 100.0;

/// Throughput snapshot for a finished run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Wall-clock duration of the run
    pub elapsed: Duration,

    /// Records collected
    pub total_items: usize,

    /// Notional request count, `max(1, total_items / 100)`
    pub pages: f64,

    /// Notional requests per minute
    pub requests_per_minute: f64,

    /// Records per second
    pub items_per_second: f64,
}

impl RunMetrics {
    /// Compute metrics from an item count and elapsed time
    ///
    /// Rates are reported as 0.0 when `elapsed` is zero.
    pub fn compute(total_items: usize, elapsed: Duration) -> Self {
        let pages = (total_items as f64 / ITEMS_PER_REQUEST).max(1.0);

        let secs = elapsed.as_secs_f64();
        let (requests_per_minute, items_per_second) = if secs > 0.0 {
            (pages / (secs / 60.0), total_items as f64 / secs)
        } else {
            (0.0, 0.0)
        };

        Self {
            elapsed,
            total_items,
            pages,
            requests_per_minute,
            items_per_second,
        }
    }

    /// Elapsed time in whole milliseconds
    pub fn elapsed_ms(&self) -> u128 {
        self.elapsed.as_millis()
    }
}

impl std::fmt::Display for RunMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "fetched {} items in {:.2}s (RPM: {:.2}, TPS: {:.2})",
            self.total_items,
            self.elapsed.as_secs_f64(),
            self.requests_per_minute,
            self.items_per_second
        )
    }
}

/// Wall-clock tracker wrapping a whole run
#[derive(Debug, Clone, Copy)]
pub struct PerformanceTracker {
    started_at: Instant,
}

impl PerformanceTracker {
    /// Start tracking (records start time)
    pub fn start() -> Self {
        Self {
            started_at: Instant::now(),
        }
    }

    /// Time since start
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Stop tracking and compute metrics
    pub fn finish(self, total_items: usize) -> RunMetrics {
        RunMetrics::compute(total_items, self.elapsed())
    }
}
