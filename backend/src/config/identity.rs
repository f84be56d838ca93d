//! Member service configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use crate::ports::CircuitBreakerConfig;

/// Member service endpoint and circuit breaker thresholds
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    /// Base URL of the member service
    pub base_url: String,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    #[serde(default = "default_recovery_timeout_secs")]
    pub recovery_timeout_secs: u64,

    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,
}

impl IdentityConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn circuit_breaker(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            recovery_timeout: Duration::from_secs(self.recovery_timeout_secs),
            success_threshold: self.success_threshold,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.base_url.is_empty() {
            return Err(ValidationError::MissingRequired("IDENTITY_BASE_URL"));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ValidationError::InvalidIdentityUrl);
        }
        if self.timeout_ms == 0 {
            return Err(ValidationError::MustBePositive("identity.timeout_ms"));
        }
        if self.failure_threshold == 0 || self.success_threshold == 0 {
            return Err(ValidationError::MustBePositive("identity circuit breaker thresholds"));
        }
        Ok(())
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout_ms: default_timeout_ms(),
            failure_threshold: default_failure_threshold(),
            recovery_timeout_secs: default_recovery_timeout_secs(),
            success_threshold: default_success_threshold(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    3_000
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_recovery_timeout_secs() -> u64 {
    30
}

fn default_success_threshold() -> u32 {
    2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_url_rejected() {
        assert!(IdentityConfig::default().validate().is_err());
    }

    #[test]
    fn test_circuit_breaker_settings() {
        let config = IdentityConfig {
            base_url: "http://member-service:8080".to_string(),
            failure_threshold: 4,
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let cb = config.circuit_breaker();
        assert_eq!(cb.failure_threshold, 4);
        assert_eq!(cb.recovery_timeout, Duration::from_secs(30));
    }
}
