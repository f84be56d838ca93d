//! Process-local circuit breaker.
//!
//! State lives in a mutex shared by every request of this process. Each
//! process trips independently, which is enough to stop one instance from
//! piling up requests against a failing dependency.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::ports::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerMetrics, CircuitState};

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    half_open_successes: u32,
    opened_at: Option<Instant>,
    total_successes: u64,
    total_failures: u64,
    times_opened: u64,
}

#[derive(Debug)]
pub struct LocalCircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerState>,
}

impl LocalCircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                half_open_successes: 0,
                opened_at: None,
                total_successes: 0,
                total_failures: 0,
                times_opened: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        // Counters stay usable even if a holder panicked
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn open(&self, inner: &mut BreakerState) {
        inner.state = CircuitState::Open;
        inner.opened_at = Some(Instant::now());
        inner.half_open_successes = 0;
        inner.times_opened += 1;
        tracing::warn!(
            breaker = %self.name,
            consecutive_failures = inner.consecutive_failures,
            "Circuit opened"
        );
    }
}

impl CircuitBreaker for LocalCircuitBreaker {
    fn state(&self) -> CircuitState {
        self.lock().state
    }

    fn should_allow(&self) -> bool {
        let mut inner = self.lock();
        let current = inner.state;
        match current {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let recovered = inner
                    .opened_at
                    .map(|at| at.elapsed() >= self.config.recovery_timeout)
                    .unwrap_or(true);
                if recovered {
                    inner.state = CircuitState::HalfOpen;
                    inner.half_open_successes = 0;
                    tracing::info!(breaker = %self.name, "Circuit half-open, probing");
                }
                recovered
            }
        }
    }

    fn record_success(&self) {
        let mut inner = self.lock();
        inner.total_successes += 1;
        inner.consecutive_failures = 0;

        if inner.state == CircuitState::HalfOpen {
            inner.half_open_successes += 1;
            if inner.half_open_successes >= self.config.success_threshold {
                inner.state = CircuitState::Closed;
                inner.opened_at = None;
                tracing::info!(breaker = %self.name, "Circuit closed");
            }
        }
    }

    fn record_failure(&self) {
        let mut inner = self.lock();
        inner.total_failures += 1;
        inner.consecutive_failures += 1;

        let current = inner.state;
        let tripped = match current {
            CircuitState::HalfOpen => true,
            CircuitState::Closed => inner.consecutive_failures >= self.config.failure_threshold,
            CircuitState::Open => false,
        };
        if tripped {
            self.open(&mut inner);
        }
    }

    fn reset(&self) {
        let mut inner = self.lock();
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.half_open_successes = 0;
        inner.opened_at = None;
    }

    fn metrics(&self) -> CircuitBreakerMetrics {
        let inner = self.lock();
        CircuitBreakerMetrics {
            state: Some(inner.state),
            total_successes: inner.total_successes,
            total_failures: inner.total_failures,
            times_opened: inner.times_opened,
            consecutive_failures: inner.consecutive_failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn breaker(recovery: Duration) -> LocalCircuitBreaker {
        LocalCircuitBreaker::new(
            "test",
            CircuitBreakerConfig {
                failure_threshold: 3,
                recovery_timeout: recovery,
                success_threshold: 2,
            },
        )
    }

    #[test]
    fn opens_after_consecutive_failures() {
        let cb = breaker(Duration::from_secs(60));
        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Closed);

        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.should_allow());
        assert_eq!(cb.metrics().times_opened, 1);
    }

    #[test]
    fn success_resets_failure_streak() {
        let cb = breaker(Duration::from_secs(60));
        cb.record_failure();
        cb.record_failure();
        cb.record_success();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn half_open_closes_after_enough_successes() {
        let cb = breaker(Duration::from_millis(1));
        for _ in 0..3 {
            cb.record_failure();
        }
        std::thread::sleep(Duration::from_millis(5));

        assert!(cb.should_allow());
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        cb.record_success();
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn failure_in_half_open_reopens() {
        let cb = breaker(Duration::from_millis(1));
        for _ in 0..3 {
            cb.record_failure();
        }
        std::thread::sleep(Duration::from_millis(5));
        assert!(cb.should_allow());

        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(cb.metrics().times_opened, 2);
    }

    #[test]
    fn reset_closes_circuit() {
        let cb = breaker(Duration::from_secs(60));
        for _ in 0..3 {
            cb.record_failure();
        }
        cb.reset();
        assert!(cb.should_allow());
    }
}
