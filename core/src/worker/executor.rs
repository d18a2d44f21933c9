//! Single page task: fetch -> classify -> enqueue or stop

use crate::cancel::CancellationSignal;
use crate::config::StopPolicy;
use crate::page::{PageIndex, PageOutcome, PageStatus, PageSummary, Record};
use crate::traits::PageFetcher;

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, OwnedSemaphorePermit};

/// One unit of work: fetch a page and hand its records to the aggregator
///
/// Tasks are spawned by the Orchestrator after the page has been admitted by
/// the rate limiter. A task always runs to completion; it never observes
/// the stop signal, it only sets it.
pub struct PageTask {
    /// Page to fetch
    page: PageIndex,

    /// Fetcher (shared across tasks via Arc)
    fetcher: Arc<dyn PageFetcher>,

    /// Result queue sender
    results_tx: mpsc::Sender<Vec<Record>>,

    /// Run-wide stop signal
    stop: Arc<CancellationSignal>,

    /// What counts as end of pagination
    policy: StopPolicy,

    /// In-flight slot, released when the task finishes
    permit: Option<OwnedSemaphorePermit>,
}

impl PageTask {
    /// Create a new page task
    pub fn new(
        page: PageIndex,
        fetcher: Arc<dyn PageFetcher>,
        results_tx: mpsc::Sender<Vec<Record>>,
        stop: Arc<CancellationSignal>,
        policy: StopPolicy,
    ) -> Self {
        Self {
            page,
            fetcher,
            results_tx,
            stop,
            policy,
            permit: None,
        }
    }

    /// Hold an in-flight permit for the lifetime of the task
    pub fn with_permit(mut self, permit: OwnedSemaphorePermit) -> Self {
        self.permit = Some(permit);
        self
    }

    /// Run the task
    pub async fn run(self) -> PageSummary {
        let start = Instant::now();
        let outcome = PageOutcome::from_fetch(self.fetcher.fetch(self.page).await);
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let status = match outcome {
            PageOutcome::Items(items) => {
                let count = items.len();
                tracing::debug!(page = %self.page, items = count, elapsed_ms, "Page fetched");
                if self.results_tx.send(items).await.is_err() {
                    tracing::warn!(page = %self.page, "Result queue closed, page dropped");
                    PageStatus::Undelivered(count)
                } else {
                    PageStatus::Items(count)
                }
            }
            PageOutcome::Exhausted => {
                tracing::debug!(page = %self.page, elapsed_ms, "Empty page, pagination exhausted");
                PageStatus::Exhausted
            }
            PageOutcome::Failed(e) => {
                tracing::warn!(page = %self.page, error = %e, elapsed_ms, "Page fetch failed");
                PageStatus::Failed(e.failure_kind())
            }
        };

        if status.stops_run(self.policy) && self.stop.cancel() {
            tracing::info!(page = %self.page, status = ?status, "Stopping page issuance");
        }

        drop(self.permit);
        PageSummary {
            page: self.page,
            status,
        }
    }

    /// Get the page index
    pub fn page(&self) -> PageIndex {
        self.page
    }
}

impl std::fmt::Debug for PageTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageTask")
            .field("page", &self.page)
            .field("fetcher", &self.fetcher.name())
            .field("policy", &self.policy)
            .field("permit", &self.permit.is_some())
            .finish()
    }
}
