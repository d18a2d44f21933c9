//! Builder pattern for Orchestrator construction

use std::sync::Arc;

use crate::channel::ChannelConfig;
use crate::config::{DrainConfig, RateLimit, StopPolicy};
use crate::error::{Error, Result};
use crate::traits::PageFetcher;

use super::executor::Orchestrator;

/// Builder for creating an Orchestrator with proper configuration
///
/// # Example
///
/// ```ignore
/// let orchestrator = OrchestratorBuilder::new()
///     .fetcher(fetcher)
///     .rate_limit(RateLimit::per_minute(1000))
///     .max_in_flight(Some(32))
///     .build()?;
///
/// let report = orchestrator.run().await?;
/// ```
pub struct OrchestratorBuilder {
    config: DrainConfig,
    fetcher: Option<Arc<dyn PageFetcher>>,
    channel_config: ChannelConfig,
}

impl OrchestratorBuilder {
    /// Create a new orchestrator builder with default configuration
    pub fn new() -> Self {
        Self {
            config: DrainConfig::default(),
            fetcher: None,
            channel_config: ChannelConfig::default(),
        }
    }

    /// Set the full drain configuration
    pub fn config(mut self, config: DrainConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the rate limit
    pub fn rate_limit(mut self, rate_limit: RateLimit) -> Self {
        self.config.rate_limit = rate_limit;
        self
    }

    /// Set the in-flight cap (`None` for unbounded fan-out)
    pub fn max_in_flight(mut self, max: Option<usize>) -> Self {
        self.config.max_in_flight = max;
        self
    }

    /// Set the page cap (`None` to run until exhaustion)
    pub fn max_pages(mut self, max: Option<u64>) -> Self {
        self.config.max_pages = max;
        self
    }

    /// Set the stop policy
    pub fn stop_policy(mut self, policy: StopPolicy) -> Self {
        self.config.stop_policy = policy;
        self
    }

    /// Set how many failed pages in a row end the run
    pub fn max_consecutive_failures(mut self, max: u32) -> Self {
        self.config.max_consecutive_failures = max;
        self
    }

    /// Set the page fetcher
    pub fn fetcher(mut self, fetcher: Arc<dyn PageFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Set the channel configuration
    pub fn channel_config(mut self, config: ChannelConfig) -> Self {
        self.channel_config = config;
        self
    }

    /// Build the orchestrator
    ///
    /// # Errors
    ///
    /// Returns an error if the fetcher is not set or if configuration
    /// validation fails.
    pub fn build(self) -> Result<Orchestrator> {
        let fetcher = self.fetcher.ok_or(Error::MissingConfig("fetcher"))?;

        self.config.validate()?;

        Ok(Orchestrator::new(self.config, fetcher, self.channel_config))
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
