//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `COURSE_SCHEDULER` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use course_scheduler::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod booking;
mod broker;
mod database;
mod error;
mod identity;
mod redis;
mod relay;
mod server;

pub use booking::BookingConfig;
pub use broker::BrokerConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use identity::IdentityConfig;
pub use redis::RedisConfig;
pub use relay::RelayConfig;
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Time budgeted per message on top of the lock wait when sizing the
/// redelivery window.
const MESSAGE_WORK_ALLOWANCE_MS: u64 = 1_000;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment, log filter)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Redis configuration (locks, idempotency, cache, streams)
    pub redis: RedisConfig,

    /// Stream names and delivery policy
    #[serde(default)]
    pub broker: BrokerConfig,

    /// Outbox sweep timing
    #[serde(default)]
    pub relay: RelayConfig,

    /// Lock, idempotency and cache timings
    #[serde(default)]
    pub booking: BookingConfig,

    /// Member service client
    pub identity: IdentityConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `COURSE_SCHEDULER` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `COURSE_SCHEDULER__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `COURSE_SCHEDULER__BOOKING__LOCK_WAIT_MS=5000` -> `booking.lock_wait_ms = 5000`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("COURSE_SCHEDULER")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for the first invalid section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.redis.validate()?;
        self.broker.validate()?;
        self.relay.validate()?;
        self.booking.validate()?;
        self.identity.validate()?;
        self.validate_redelivery_window()?;
        Ok(())
    }

    /// A batch still being worked on must not be reclaimed by another
    /// consumer: that consumer would ack entries as duplicates while the
    /// first one later aborts and releases their claims.
    fn validate_redelivery_window(&self) -> Result<(), ValidationError> {
        let per_message_ms = self.booking.lock_wait_ms + MESSAGE_WORK_ALLOWANCE_MS;
        let batch_ms = per_message_ms.saturating_mul(self.broker.batch_size as u64);
        if self.broker.redelivery_idle_ms <= batch_ms {
            return Err(ValidationError::RedeliveryWindowTooShort {
                idle_ms: self.broker.redelivery_idle_ms,
                batch_ms,
            });
        }
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
