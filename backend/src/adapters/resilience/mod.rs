//! Resilience adapters.

mod circuit_breaker;

pub use circuit_breaker::LocalCircuitBreaker;
