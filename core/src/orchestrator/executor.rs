//! Orchestrator execution logic

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};

use crate::cancel::CancellationSignal;
use crate::channel::ChannelConfig;
use crate::config::DrainConfig;
use crate::error::Result;
use crate::metrics::PerformanceTracker;
use crate::page::{PageIndex, PageSummary};
use crate::report::FetchReport;
use crate::traits::PageFetcher;
use crate::worker::{FetchStats, PageRateLimiter, PageTask};

use super::aggregator::Aggregator;

/// Orchestrator manages a drain from first page to exhaustion
///
/// Responsible for issuing page indices, pacing them through the shared
/// rate limiter, spawning one task per page, and handing the final
/// collection back to the caller.
pub struct Orchestrator {
    /// Drain configuration
    pub(crate) config: DrainConfig,

    /// Page fetcher (shared across page tasks)
    pub(crate) fetcher: Arc<dyn PageFetcher>,

    /// Result queue sizing
    pub(crate) channel_config: ChannelConfig,

    /// Global admission gate
    pub(crate) rate_limiter: Arc<PageRateLimiter>,

    /// Optional in-flight limiter
    pub(crate) semaphore: Option<Arc<Semaphore>>,

    /// External shutdown signal
    pub(crate) shutdown: Arc<CancellationSignal>,
}

impl Orchestrator {
    /// Create a new orchestrator
    ///
    /// Use `OrchestratorBuilder` for a more ergonomic construction.
    pub fn new(
        config: DrainConfig,
        fetcher: Arc<dyn PageFetcher>,
        channel_config: ChannelConfig,
    ) -> Self {
        let rate_limiter = Arc::new(PageRateLimiter::new(config.rate_limit));
        let semaphore = config.max_in_flight.map(|n| Arc::new(Semaphore::new(n)));

        Self {
            config,
            fetcher,
            channel_config,
            rate_limiter,
            semaphore,
            shutdown: Arc::new(CancellationSignal::new()),
        }
    }

    /// Get a handle to the shutdown signal
    pub fn shutdown_signal(&self) -> Arc<CancellationSignal> {
        Arc::clone(&self.shutdown)
    }

    /// Stop issuing pages
    ///
    /// A pending admission is aborted; pages already dispatched still finish
    /// and their records are kept. The signal stays set, so later runs on
    /// this orchestrator return immediately.
    pub fn shutdown(&self) {
        if self.shutdown.cancel() {
            tracing::info!("Shutdown requested");
        }
    }

    /// Get the drain configuration
    pub fn config(&self) -> &DrainConfig {
        &self.config
    }

    /// Run the drain
    ///
    /// Issues pages 0, 1, 2, ... until a page task sets the stop signal, the
    /// page cap is reached, or shutdown is requested; then waits for every
    /// dispatched task, closes the result queue and collects the records.
    ///
    /// Page failures never produce `Err`; see [`FetchReport::is_truncated`].
    pub async fn run(&self) -> Result<FetchReport> {
        let started_at = chrono::Utc::now();
        let tracker = PerformanceTracker::start();

        let stop = Arc::new(CancellationSignal::new());
        let (results_tx, results_rx) = mpsc::channel(self.channel_config.result_buffer);
        let aggregator = Aggregator::spawn(results_rx);

        let mut tasks = JoinSet::new();
        let mut stats = FetchStats::new();
        let mut page = PageIndex::FIRST;

        tracing::info!(
            fetcher = self.fetcher.name(),
            rate_limit = ?self.config.rate_limit,
            max_in_flight = ?self.config.max_in_flight,
            max_pages = ?self.config.max_pages,
            stop_policy = ?self.config.stop_policy,
            max_consecutive_failures = self.config.max_consecutive_failures,
            "Starting concurrent fetch"
        );

        // Running: one admission per page, no page after the stop is seen.
        loop {
            if stop.is_cancelled() {
                tracing::debug!(next_page = %page, "Stop observed, draining");
                break;
            }

            if self.config.max_pages.is_some_and(|max| page.0 >= max) {
                tracing::info!(pages = page.0, "Page cap reached, draining");
                break;
            }

            let Some(permit) = self.acquire_slot().await else {
                tracing::info!(next_page = %page, "Shutdown while waiting for a slot");
                break;
            };

            if let Err(e) = self.rate_limiter.admit(&self.shutdown).await {
                tracing::warn!(next_page = %page, error = %e, "Admission aborted, stopping issuance");
                break;
            }

            // A page may have finished the run while this one waited for admission.
            if stop.is_cancelled() {
                tracing::debug!(next_page = %page, "Stop observed after admission, draining");
                break;
            }

            let mut task = PageTask::new(
                page,
                Arc::clone(&self.fetcher),
                results_tx.clone(),
                Arc::clone(&stop),
                self.config.stop_policy,
            );
            if let Some(permit) = permit {
                task = task.with_permit(permit);
            }

            stats.record_dispatch(page);
            tasks.spawn(task.run());
            page = page.next();

            while let Some(joined) = tasks.try_join_next() {
                self.record_joined(&mut stats, &stop, joined);
            }
        }

        // Draining: join in-flight tasks, then close the queue.
        tracing::debug!(in_flight = tasks.len(), "Waiting for in-flight pages");
        while let Some(joined) = tasks.join_next().await {
            self.record_joined(&mut stats, &stop, joined);
        }
        drop(results_tx);

        let records = aggregator.finish().await?;
        let metrics = tracker.finish(records.len());

        tracing::info!(
            items = records.len(),
            pages_dispatched = stats.pages_dispatched,
            pages_failed = stats.pages_failed,
            elapsed_ms = metrics.elapsed_ms() as u64,
            rpm = metrics.requests_per_minute,
            tps = metrics.items_per_second,
            "Fetch completed"
        );

        if stats.is_truncated() {
            tracing::warn!(
                first_failure = ?stats.first_failure(),
                pages_failed = stats.pages_failed,
                pages_throttled = stats.pages_throttled,
                "Some pages failed, results may be incomplete"
            );
        }

        Ok(FetchReport {
            started_at,
            records,
            metrics,
            stats,
        })
    }

    /// Run with Ctrl+C signal handling
    ///
    /// Automatically triggers graceful shutdown on Ctrl+C.
    pub async fn run_with_signal_handling(&self) -> Result<FetchReport> {
        let shutdown = Arc::clone(&self.shutdown);

        let signal_handle = tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
                    shutdown.cancel();
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to listen for Ctrl+C");
                }
            }
        });

        let result = self.run().await;
        signal_handle.abort();

        result
    }

    /// Run with a timeout
    ///
    /// Automatically triggers shutdown when timeout is reached.
    pub async fn run_with_timeout(&self, timeout: Duration) -> Result<FetchReport> {
        let shutdown = Arc::clone(&self.shutdown);

        let timeout_handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            tracing::info!("Timeout reached, initiating shutdown...");
            shutdown.cancel();
        });

        let result = self.run().await;
        timeout_handle.abort();

        result
    }

    /// Fold a joined page task into the stats
    ///
    /// A panic, or `max_consecutive_failures` failed pages in a row, sets
    /// the stop signal whatever the stop policy.
    fn record_joined(
        &self,
        stats: &mut FetchStats,
        stop: &CancellationSignal,
        joined: std::result::Result<PageSummary, JoinError>,
    ) {
        match joined {
            Ok(summary) => {
                stats.record(&summary);
                let limit = self.config.max_consecutive_failures as usize;
                if stats.consecutive_failures >= limit && stop.cancel() {
                    tracing::warn!(
                        page = %summary.page,
                        consecutive_failures = stats.consecutive_failures,
                        "Too many failed pages in a row, stopping issuance"
                    );
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Page task panicked");
                stats.record_panic();
                stop.cancel();
            }
        }
    }

    /// Take an in-flight slot if a cap is configured
    ///
    /// `Some(None)` means uncapped; `None` means shutdown won the race.
    async fn acquire_slot(&self) -> Option<Option<OwnedSemaphorePermit>> {
        let Some(semaphore) = &self.semaphore else {
            return Some(None);
        };

        tokio::select! {
            biased;

            _ = self.shutdown.cancelled() => None,
            permit = Arc::clone(semaphore).acquire_owned() => permit.ok().map(Some),
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("fetcher", &self.fetcher.name())
            .field("rate_limiter", &self.rate_limiter)
            .field("shutdown", &self.shutdown.is_cancelled())
            .finish()
    }
}
