//! pagedrain-core: rate-limited concurrent pagination
//!
//! This crate drains a paginated remote collection by issuing many page
//! requests concurrently, paced by one shared token bucket, and aggregates
//! the records until the source runs out or fails. It provides:
//!
//! - The `PageFetcher` trait and page outcome types
//! - A governor-backed rate limiter and an idempotent cancellation signal
//! - The Orchestrator (dispatch loop) and Aggregator (single consumer)
//! - Run metrics and per-page statistics
//! - Error handling

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cancel;
pub mod channel;
pub mod config;
pub mod error;
pub mod metrics;
pub mod orchestrator;
pub mod page;
pub mod report;
pub mod traits;
pub mod worker;

pub use cancel::CancellationSignal;
pub use channel::ChannelConfig;
pub use config::{ConfigError, DrainConfig, RateLimit, StopPolicy};
pub use error::{Error, Result};
pub use metrics::{PerformanceTracker, RunMetrics};
pub use orchestrator::{Orchestrator, OrchestratorBuilder};
pub use page::{PageIndex, PageOutcome, PageStatus, PageSummary, Record};
pub use report::FetchReport;
pub use traits::{FailureKind, FetchError, PageFetcher};
pub use worker::{FetchStats, LimiterError, PageRateLimiter};
