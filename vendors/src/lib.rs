//! Page fetcher implementations for pagedrain
//!
//! This crate provides implementations of the `PageFetcher` trait for:
//!
//! - Paginated JSON task-list endpoints over HTTP (`HttpPageFetcher`)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod http;

pub use config::{FetcherConfig, FetcherConfigError};
pub use http::HttpPageFetcher;
