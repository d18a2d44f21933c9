//! HTTP fetcher configuration
//!
//! Connection details for the remote task-list endpoint: where it lives,
//! which collection to page through, the credential, and the per-request
//! timeout.

use std::time::Duration;

use reqwest::header::HeaderValue;
use reqwest::Url;
use thiserror::Error;

/// Default API root
pub const DEFAULT_BASE_URL: &str = "https://api.clickup.com/api/v2";

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default name of the records array in each response body
pub const DEFAULT_ITEMS_FIELD: &str = "tasks";

/// Longest accepted per-request timeout
const MAX_TIMEOUT: Duration = Duration::from_secs(300);

/// Configuration validation error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetcherConfigError {
    /// A required configuration field is missing.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A timeout value is out of acceptable range.
    #[error("invalid timeout: {0:?}")]
    InvalidTimeout(Duration),

    /// The base URL is not an http(s) URL.
    #[error("invalid base url: {0}")]
    InvalidUrl(String),

    /// The token cannot be sent as a header value.
    #[error("token contains characters not allowed in a header")]
    InvalidToken,

    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// Configuration for [`HttpPageFetcher`](crate::HttpPageFetcher).
#[derive(Clone)]
pub struct FetcherConfig {
    /// API root, without trailing slash
    pub base_url: String,

    /// Team / collection identifier placed in the path
    pub collection_id: String,

    /// Value of the `Authorization` header, sent as given
    pub token: String,

    /// Per-request timeout
    pub timeout: Duration,

    /// Name of the records array in the response body
    pub items_field: String,

    /// Request closed items too
    pub include_closed: bool,

    /// Request nested sub-items too
    pub subtasks: bool,
}

impl FetcherConfig {
    /// Create a config for `collection_id` authorized by `token`, with defaults
    pub fn new(collection_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            collection_id: collection_id.into(),
            token: token.into(),
            timeout: DEFAULT_TIMEOUT,
            items_field: DEFAULT_ITEMS_FIELD.to_string(),
            include_closed: true,
            subtasks: true,
        }
    }

    /// Override the API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the records field name
    pub fn with_items_field(mut self, field: impl Into<String>) -> Self {
        self.items_field = field.into();
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), FetcherConfigError> {
        if self.collection_id.trim().is_empty() {
            return Err(FetcherConfigError::MissingField("collection_id"));
        }
        if self.token.trim().is_empty() {
            return Err(FetcherConfigError::MissingField("token"));
        }
        if self.items_field.is_empty() {
            return Err(FetcherConfigError::MissingField("items_field"));
        }
        match Url::parse(&self.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") && !url.cannot_be_a_base() => {}
            _ => return Err(FetcherConfigError::InvalidUrl(self.base_url.clone())),
        }
        if self.timeout.is_zero() || self.timeout > MAX_TIMEOUT {
            return Err(FetcherConfigError::InvalidTimeout(self.timeout));
        }
        if HeaderValue::from_str(&self.token).is_err() {
            return Err(FetcherConfigError::InvalidToken);
        }
        Ok(())
    }
}

impl std::fmt::Debug for FetcherConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetcherConfig")
            .field("base_url", &self.base_url)
            .field("collection_id", &self.collection_id)
            .field("token", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("items_field", &self.items_field)
            .field("include_closed", &self.include_closed)
            .field("subtasks", &self.subtasks)
            .finish()
    }
}
