//! Channel configuration for page result hand-off

/// Channel buffer configuration for orchestrator communication
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Result queue capacity in batches (page tasks -> aggregator)
    ///
    /// A full queue blocks the sending page task until the aggregator
    /// catches up.
    pub result_buffer: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self { result_buffer: 100 }
    }
}

impl ChannelConfig {
    /// Create a new channel config with custom result buffer size
    ///
    /// Sizes below one are raised to one.
    pub fn with_result_buffer(mut self, size: usize) -> Self {
        self.result_buffer = size.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_config_default() {
        let config = ChannelConfig::default();
        assert_eq!(config.result_buffer, 100);
    }

    #[test]
    fn test_channel_config_builder() {
        let config = ChannelConfig::default().with_result_buffer(5000);
        assert_eq!(config.result_buffer, 5000);
    }

    #[test]
    fn test_channel_config_zero_clamped() {
        let config = ChannelConfig::default().with_result_buffer(0);
        assert_eq!(config.result_buffer, 1);
    }
}
