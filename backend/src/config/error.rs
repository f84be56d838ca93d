//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid socket address: {0}")]
    InvalidSocketAddr(String),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Invalid Redis URL format")]
    InvalidRedisUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Stream names must be distinct: {0}")]
    DuplicateStreamName(String),

    #[error("{0} must be greater than zero")]
    MustBePositive(&'static str),

    #[error("Lock lease must exceed the lock wait")]
    LeaseShorterThanWait,

    #[error("Lock retry interval must be shorter than the lock wait")]
    RetryNotShorterThanWait,

    #[error("Invalid member service URL")]
    InvalidIdentityUrl,

    #[error("broker.redelivery_idle_ms ({idle_ms}) must exceed the worst-case batch time ({batch_ms} ms)")]
    RedeliveryWindowTooShort { idle_ms: u64, batch_ms: u64 },
}
