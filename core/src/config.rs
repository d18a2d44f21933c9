//! Drain configuration types

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Global request ceiling: at most `max_requests` page dispatches per `period_ms`.
///
/// Permits are spaced evenly (burst of one), so the effective behavior is a
/// minimum gap of `period / max_requests` between consecutive admissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    /// Permits granted per period
    pub max_requests: u32,

    /// Length of the window in milliseconds
    pub period_ms: u64,
}

impl RateLimit {
    /// Create a rate limit of `max_requests` per `period`
    ///
    /// The period has millisecond resolution; a sub-millisecond remainder is
    /// rounded up, which only ever makes the limit stricter.
    pub fn new(max_requests: u32, period: Duration) -> Self {
        let period_ms = period.as_nanos().div_ceil(1_000_000);
        Self {
            max_requests,
            period_ms: u64::try_from(period_ms).unwrap_or(u64::MAX),
        }
    }

    /// `max_requests` per second
    pub fn per_second(max_requests: u32) -> Self {
        Self::new(max_requests, Duration::from_secs(1))
    }

    /// `max_requests` per minute
    pub fn per_minute(max_requests: u32) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    /// Window length
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    /// Minimum spacing between two admissions
    ///
    /// Returns `None` when the limit is degenerate (zero requests or zero period).
    pub fn min_spacing(&self) -> Option<Duration> {
        if self.max_requests == 0 || self.period_ms == 0 {
            return None;
        }
        let spacing = self.period() / self.max_requests;
        (!spacing.is_zero()).then_some(spacing)
    }
}

impl Default for RateLimit {
    fn default() -> Self {
        Self::per_minute(1000)
    }
}

/// What ends a run besides explicit shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopPolicy {
    /// An empty page and a failed page both stop issuance.
    ///
    /// A transient failure therefore truncates the collected results.
    #[default]
    AnyAnomaly,

    /// Only an empty page stops issuance; failed pages are recorded and skipped.
    ///
    /// A run of `max_consecutive_failures` failed pages in a row still ends
    /// the drain, so an endpoint that always fails cannot keep it going.
    ExhaustionOnly,
}

impl StopPolicy {
    /// Whether a failed page should stop the run
    pub fn stops_on_failure(&self) -> bool {
        matches!(self, StopPolicy::AnyAnomaly)
    }
}

impl std::str::FromStr for StopPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "any_anomaly" | "any-anomaly" | "any" => Ok(StopPolicy::AnyAnomaly),
            "exhaustion_only" | "exhaustion-only" | "exhaustion" => Ok(StopPolicy::ExhaustionOnly),
            _ => Err(format!("Unknown stop policy: {}", s)),
        }
    }
}

/// Default cap on failed pages in a row before the run gives up
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 10;

fn default_max_consecutive_failures() -> u32 {
    DEFAULT_MAX_CONSECUTIVE_FAILURES
}

/// Drain configuration
///
/// Defines how pages are issued: the shared rate ceiling, an optional cap
/// on concurrently running page tasks, an optional cap on the number of
/// pages issued, and the stop policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrainConfig {
    /// Global dispatch rate ceiling
    #[serde(default)]
    pub rate_limit: RateLimit,

    /// Optional cap on in-flight page tasks (unbounded when `None`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_in_flight: Option<usize>,

    /// Optional cap on pages issued per run (unbounded when `None`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pages: Option<u64>,

    /// What counts as end of pagination
    #[serde(default)]
    pub stop_policy: StopPolicy,

    /// Failed pages in a row (in completion order) that end the run
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
}

impl Default for DrainConfig {
    fn default() -> Self {
        Self {
            rate_limit: RateLimit::default(),
            max_in_flight: None,
            max_pages: None,
            stop_policy: StopPolicy::default(),
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
        }
    }
}

impl DrainConfig {
    /// Create a config with the given rate limit
    pub fn new(rate_limit: RateLimit) -> Self {
        Self {
            rate_limit,
            ..Default::default()
        }
    }

    /// Set the in-flight cap
    pub fn with_max_in_flight(mut self, max: usize) -> Self {
        self.max_in_flight = Some(max);
        self
    }

    /// Set the page cap
    pub fn with_max_pages(mut self, max: u64) -> Self {
        self.max_pages = Some(max);
        self
    }

    /// Set the stop policy
    pub fn with_stop_policy(mut self, policy: StopPolicy) -> Self {
        self.stop_policy = policy;
        self
    }

    /// Set how many failed pages in a row end the run
    pub fn with_max_consecutive_failures(mut self, max: u32) -> Self {
        self.max_consecutive_failures = max;
        self
    }

    /// Parse a config from JSON
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit.max_requests == 0 {
            return Err(ConfigError::InvalidRateLimit(
                "max_requests must be at least 1".into(),
            ));
        }

        if self.rate_limit.period_ms == 0 {
            return Err(ConfigError::InvalidRateLimit(
                "period must be positive".into(),
            ));
        }

        if self.rate_limit.min_spacing().is_none() {
            return Err(ConfigError::InvalidRateLimit(format!(
                "{} requests per {}ms is finer than the limiter resolution",
                self.rate_limit.max_requests, self.rate_limit.period_ms
            )));
        }

        if self.max_in_flight == Some(0) {
            return Err(ConfigError::InvalidConcurrency(
                "max_in_flight must be at least 1".into(),
            ));
        }

        if self.max_consecutive_failures == 0 {
            return Err(ConfigError::InvalidFailureLimit(
                "max_consecutive_failures must be at least 1".into(),
            ));
        }

        if self.max_pages == Some(0) {
            return Err(ConfigError::InvalidPageCap(
                "max_pages must be at least 1".into(),
            ));
        }

        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Invalid rate limit
    #[error("Invalid rate limit: {0}")]
    InvalidRateLimit(String),

    /// Invalid in-flight cap
    #[error("Invalid concurrency: {0}")]
    InvalidConcurrency(String),

    /// Invalid page cap
    #[error("Invalid page cap: {0}")]
    InvalidPageCap(String),

    /// Invalid consecutive-failure limit
    #[error("Invalid failure limit: {0}")]
    InvalidFailureLimit(String),

    /// Config file could not be parsed
    #[error("Invalid config file: {0}")]
    Parse(String),
}
