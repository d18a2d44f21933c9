//! Error types for pagedrain-core

use thiserror::Error;

use crate::config::ConfigError;

/// Core error type
///
/// Only setup and coordination failures surface here. Individual page
/// failures are absorbed into the run's stop signal and reported through
/// [`FetchStats`](crate::worker::FetchStats).
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A required builder field was not provided
    #[error("missing required configuration: {0}")]
    MissingConfig(&'static str),

    /// Orchestration error (aggregator or coordination task failed)
    #[error("orchestration error: {0}")]
    Orchestration(String),
}

impl Error {
    /// Create an orchestration error
    pub fn orchestration(msg: impl Into<String>) -> Self {
        Error::Orchestration(msg.into())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
