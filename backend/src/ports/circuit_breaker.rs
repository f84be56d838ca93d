//! CircuitBreaker port - fail fast while a dependency is down.
//!
//! Booking requests need the member service to resolve who is booking
//! whom. When that service keeps failing, requests are rejected at once
//! instead of each waiting for its own timeout.
//!
//! ## Transitions
//!
//! ```text
//! Closed --[failure_threshold consecutive failures]--> Open
//! Open --[recovery_timeout elapsed]--> HalfOpen
//! HalfOpen --[success_threshold successes]--> Closed
//! HalfOpen --[any failure]--> Open
//! ```

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Requests flow through.
    Closed,

    /// Requests are rejected without calling the dependency.
    Open,

    /// A trial request is allowed to probe recovery.
    HalfOpen,
}

impl CircuitState {
    pub fn allows_requests(&self) -> bool {
        matches!(self, CircuitState::Closed | CircuitState::HalfOpen)
    }
}

/// Thresholds controlling breaker transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit.
    ///
    /// Default: 5 failures
    pub failure_threshold: u32,

    /// How long the circuit stays open before probing.
    ///
    /// Default: 30 seconds
    pub recovery_timeout: Duration,

    /// Successes in half-open state needed to close again.
    ///
    /// Default: 2 successes
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(30),
            success_threshold: 2,
        }
    }
}

/// Port for circuit breaker functionality.
///
/// # Example
///
/// ```ignore
/// if !self.breaker.should_allow() {
///     return Err(IdentityError::Unavailable("circuit open".into()));
/// }
///
/// match self.inner.student_info(token).await {
///     Ok(identity) => {
///         self.breaker.record_success();
///         Ok(identity)
///     }
///     Err(e) => {
///         self.breaker.record_failure();
///         Err(e)
///     }
/// }
/// ```
pub trait CircuitBreaker: Send + Sync {
    fn state(&self) -> CircuitState;

    /// Returns `false` while the circuit is open.
    ///
    /// Moves an open circuit to half-open once the recovery timeout elapsed.
    fn should_allow(&self) -> bool;

    fn record_success(&self);

    /// In half-open state this reopens the circuit immediately.
    fn record_failure(&self);

    /// Forces the circuit closed.
    fn reset(&self);

    fn metrics(&self) -> CircuitBreakerMetrics;
}

/// Counters exposed for logging.
#[derive(Debug, Clone, Default)]
pub struct CircuitBreakerMetrics {
    pub state: Option<CircuitState>,
    pub total_successes: u64,
    pub total_failures: u64,
    pub times_opened: u64,
    pub consecutive_failures: u32,
}
