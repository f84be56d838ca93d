//! Outbox relay configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Timing of the periodic outbox sweep
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Delay between sweeps in milliseconds
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,

    /// Delay before the first sweep after startup
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Maximum records republished per sweep
    #[serde(default = "default_sweep_batch_size")]
    pub sweep_batch_size: u32,
}

impl RelayConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.sweep_interval_ms == 0 {
            return Err(ValidationError::MustBePositive("relay.sweep_interval_ms"));
        }
        if self.sweep_batch_size == 0 {
            return Err(ValidationError::MustBePositive("relay.sweep_batch_size"));
        }
        Ok(())
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            sweep_interval_ms: default_sweep_interval_ms(),
            initial_delay_ms: default_initial_delay_ms(),
            sweep_batch_size: default_sweep_batch_size(),
        }
    }
}

fn default_sweep_interval_ms() -> u64 {
    10_000
}

fn default_initial_delay_ms() -> u64 {
    5_000
}

fn default_sweep_batch_size() -> u32 {
    500
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.sweep_interval(), Duration::from_secs(10));
        assert_eq!(config.initial_delay(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = RelayConfig {
            sweep_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
