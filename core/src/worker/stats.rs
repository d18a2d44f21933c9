//! Per-run page statistics

use serde::{Deserialize, Serialize};

use crate::page::{PageIndex, PageStatus, PageSummary};
use crate::traits::FailureKind;

/// Counters accumulated from every finished page task
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchStats {
    /// Pages admitted and dispatched
    pub pages_dispatched: usize,

    /// Pages that returned records
    pub pages_with_items: usize,

    /// Pages that came back empty
    pub pages_exhausted: usize,

    /// Pages that failed (transport or throttle)
    pub pages_failed: usize,

    /// Subset of failed pages rejected with 429
    pub pages_throttled: usize,

    /// Task panics (counted separately from fetch failures)
    pub tasks_panicked: usize,

    /// Records handed to the aggregator
    pub items_enqueued: usize,

    /// Records fetched but not delivered
    pub items_dropped: usize,

    /// Failed pages in a row, in completion order; reset by any delivered page
    pub consecutive_failures: usize,

    /// Failed page indices, ascending
    pub failed_pages: Vec<PageIndex>,

    /// Highest page index dispatched
    pub highest_dispatched: Option<PageIndex>,
}

impl FetchStats {
    /// Create new empty stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a dispatch
    pub fn record_dispatch(&mut self, page: PageIndex) {
        self.pages_dispatched += 1;
        self.highest_dispatched = Some(self.highest_dispatched.map_or(page, |p| p.max(page)));
    }

    /// Record a finished page task
    pub fn record(&mut self, summary: &PageSummary) {
        match summary.status {
            PageStatus::Items(n) => {
                self.pages_with_items += 1;
                self.items_enqueued += n;
                self.consecutive_failures = 0;
            }
            PageStatus::Exhausted => {
                self.pages_exhausted += 1;
                self.consecutive_failures = 0;
            }
            PageStatus::Failed(kind) => {
                self.pages_failed += 1;
                self.consecutive_failures += 1;
                if kind == FailureKind::Throttled {
                    self.pages_throttled += 1;
                }
                let pos = self.failed_pages.partition_point(|p| *p < summary.page);
                self.failed_pages.insert(pos, summary.page);
            }
            PageStatus::Undelivered(n) => {
                self.pages_with_items += 1;
                self.items_dropped += n;
                self.consecutive_failures = 0;
            }
        }
    }

    /// Record a page task that panicked
    pub fn record_panic(&mut self) {
        self.tasks_panicked += 1;
    }

    /// Total finished pages
    pub fn pages_completed(&self) -> usize {
        self.pages_with_items + self.pages_exhausted + self.pages_failed
    }

    /// Whether the collected records may be missing data
    ///
    /// True when any page failed, panicked or was dropped. Failures are not
    /// retried, so a transient error cuts the collection short.
    pub fn is_truncated(&self) -> bool {
        self.pages_failed > 0 || self.tasks_panicked > 0 || self.items_dropped > 0
    }

    /// Lowest failed page, if any
    pub fn first_failure(&self) -> Option<PageIndex> {
        self.failed_pages.first().copied()
    }
}
