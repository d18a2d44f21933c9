//! Orchestrator for drain lifecycle management
//!
//! The Orchestrator coordinates one complete drain of a paginated source:
//! - Issuing page indices, each gated by one rate-limiter admission
//! - Spawning one task per page (optionally capped by a semaphore)
//! - Stopping issuance on exhaustion, failure (per policy), or shutdown
//! - Joining in-flight pages and collecting their records
//!
//! # Example
//!
//! ```ignore
//! use pagedrain_core::{OrchestratorBuilder, RateLimit};
//!
//! let orchestrator = OrchestratorBuilder::new()
//!     .fetcher(fetcher)
//!     .rate_limit(RateLimit::per_minute(1000))
//!     .build()?;
//!
//! let report = orchestrator.run_with_signal_handling().await?;
//! println!("{}", report.metrics);
//! ```

mod aggregator;
mod builder;
mod executor;

pub use aggregator::Aggregator;
pub use builder::OrchestratorBuilder;
pub use executor::Orchestrator;
