//! Worker module: per-page work units and their pacing
//!
//! A page task is the core execution unit in pagedrain, responsible for one
//! short sequence: **fetch -> classify -> enqueue (or stop)**.
//!
//! There is no worker pool. The Orchestrator spawns one task per page, and the
//! only thing bounding fan-out is the shared [`PageRateLimiter`] (plus an
//! optional in-flight semaphore). Each task:
//!
//! 1. Calls the [`PageFetcher`](crate::PageFetcher) for its page
//! 2. Classifies the result into records, exhaustion, or failure
//! 3. Sends records to the aggregator via channel
//! 4. Sets the run's stop signal on exhaustion (or failure, per policy)
//! 5. Returns a [`PageSummary`](crate::PageSummary) folded into [`FetchStats`]
//!
//! # Example
//!
//! ```ignore
//! use pagedrain_core::worker::PageTask;
//!
//! let task = PageTask::new(page, fetcher, results_tx, stop, StopPolicy::AnyAnomaly);
//! let summary = tokio::spawn(task.run()).await?;
//! stats.record(&summary);
//! ```

mod executor;
mod rate_limiter;
mod stats;

pub use executor::PageTask;
pub use rate_limiter::{LimiterError, PageRateLimiter};
pub use stats::FetchStats;
