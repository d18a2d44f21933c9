//! Core trait for page fetchers
//!
//! The trait is defined in core so the orchestrator can drive any source.
//! The HTTP implementation lives in the vendors crate.

use crate::page::{PageIndex, Record};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// Page Fetcher Trait
// ============================================================================

/// Retrieves a single page of a remote collection
///
/// Implementations must be stateless with respect to pagination and safe
/// to call from many tasks at once. One call is one remote request: no
/// retries.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetcher identifier (e.g., "http")
    fn name(&self) -> &str;

    /// Fetch page `page`
    ///
    /// An empty `Vec` means the collection is exhausted.
    async fn fetch(&self, page: PageIndex) -> Result<Vec<Record>, FetchError>;
}

// ============================================================================
// Fetch Errors
// ============================================================================

/// Page fetch errors
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// HTTP/network error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Request timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Rate limited by the remote (HTTP 429)
    #[error("Rate limited: retry after {retry_after:?}")]
    RateLimited {
        /// Suggested retry delay, if the remote sent one
        retry_after: Option<Duration>,
    },

    /// Non-success status other than 429
    #[error("Unexpected status: {status} - {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// Response body could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),
}

impl FetchError {
    /// Check whether the remote explicitly throttled this request
    pub fn is_throttle(&self) -> bool {
        matches!(self, FetchError::RateLimited { .. })
    }

    /// Classify for stats
    pub fn failure_kind(&self) -> FailureKind {
        if self.is_throttle() {
            FailureKind::Throttled
        } else {
            FailureKind::Transport
        }
    }
}

/// Coarse failure classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Network, timeout, status or decode failure
    Transport,
    /// Explicit rate-limit rejection from the remote
    Throttled,
}
