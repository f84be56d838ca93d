//! Booking pipeline configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Lock, idempotency and cache timings plus slot limits
#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    /// How long a consumer waits for a teacher lock
    #[serde(default = "default_lock_wait_ms")]
    pub lock_wait_ms: u64,

    /// How long a granted teacher lock lives without release
    #[serde(default = "default_lock_lease_ms")]
    pub lock_lease_ms: u64,

    /// Pause between lock attempts while waiting
    #[serde(default = "default_lock_retry_ms")]
    pub lock_retry_ms: u64,

    #[serde(default = "default_idempotency_ttl_secs")]
    pub idempotency_ttl_secs: u64,

    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Highest class hour a slot may hold
    #[serde(default = "default_max_slot_hour")]
    pub max_slot_hour: u8,
}

impl BookingConfig {
    pub fn lock_wait(&self) -> Duration {
        Duration::from_millis(self.lock_wait_ms)
    }

    pub fn lock_lease(&self) -> Duration {
        Duration::from_millis(self.lock_lease_ms)
    }

    pub fn lock_retry(&self) -> Duration {
        Duration::from_millis(self.lock_retry_ms)
    }

    pub fn idempotency_ttl(&self) -> Duration {
        Duration::from_secs(self.idempotency_ttl_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.lock_wait_ms == 0 {
            return Err(ValidationError::MustBePositive("booking.lock_wait_ms"));
        }
        if self.lock_lease_ms <= self.lock_wait_ms {
            return Err(ValidationError::LeaseShorterThanWait);
        }
        if self.lock_retry_ms == 0 {
            return Err(ValidationError::MustBePositive("booking.lock_retry_ms"));
        }
        if self.lock_retry_ms >= self.lock_wait_ms {
            return Err(ValidationError::RetryNotShorterThanWait);
        }
        if self.idempotency_ttl_secs == 0 {
            return Err(ValidationError::MustBePositive("booking.idempotency_ttl_secs"));
        }
        if self.cache_ttl_secs == 0 {
            return Err(ValidationError::MustBePositive("booking.cache_ttl_secs"));
        }
        if self.max_slot_hour == 0 {
            return Err(ValidationError::MustBePositive("booking.max_slot_hour"));
        }
        Ok(())
    }
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            lock_wait_ms: default_lock_wait_ms(),
            lock_lease_ms: default_lock_lease_ms(),
            lock_retry_ms: default_lock_retry_ms(),
            idempotency_ttl_secs: default_idempotency_ttl_secs(),
            cache_ttl_secs: default_cache_ttl_secs(),
            max_slot_hour: default_max_slot_hour(),
        }
    }
}

fn default_lock_wait_ms() -> u64 {
    5_000
}

fn default_lock_lease_ms() -> u64 {
    30_000
}

fn default_lock_retry_ms() -> u64 {
    50
}

fn default_idempotency_ttl_secs() -> u64 {
    7 * SECONDS_PER_DAY
}

fn default_cache_ttl_secs() -> u64 {
    7 * SECONDS_PER_DAY
}

fn default_max_slot_hour() -> u8 {
    12
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_defaults() {
        let config = BookingConfig::default();
        assert_eq!(config.lock_wait(), Duration::from_secs(5));
        assert_eq!(config.lock_lease(), Duration::from_secs(30));
        assert_eq!(config.idempotency_ttl(), Duration::from_secs(604_800));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_lease_must_exceed_wait() {
        let config = BookingConfig {
            lock_wait_ms: 30_000,
            lock_lease_ms: 30_000,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::LeaseShorterThanWait));
    }

    #[test]
    fn test_lock_retry_must_be_shorter_than_wait() {
        let config = BookingConfig {
            lock_wait_ms: 100,
            lock_retry_ms: 100,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::RetryNotShorterThanWait));
    }
}
