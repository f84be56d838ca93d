//! IdentityLookup wrapper that fails fast while the member service is down.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::schedule::MemberIdentity;
use crate::ports::{CircuitBreaker, IdentityError, IdentityLookup};

pub struct CircuitBreakingIdentityLookup {
    inner: Arc<dyn IdentityLookup>,
    breaker: Arc<dyn CircuitBreaker>,
}

impl CircuitBreakingIdentityLookup {
    pub fn new(inner: Arc<dyn IdentityLookup>, breaker: Arc<dyn CircuitBreaker>) -> Self {
        Self { inner, breaker }
    }
}

#[async_trait]
impl IdentityLookup for CircuitBreakingIdentityLookup {
    async fn student_info(&self, auth_token: &str) -> Result<MemberIdentity, IdentityError> {
        if !self.breaker.should_allow() {
            return Err(IdentityError::Unavailable("circuit open".to_string()));
        }

        match self.inner.student_info(auth_token).await {
            Ok(identity) => {
                self.breaker.record_success();
                Ok(identity)
            }
            // Caller errors say nothing about the service's health
            Err(e) if !e.is_dependency_fault() => {
                self.breaker.record_success();
                Err(e)
            }
            Err(e) => {
                self.breaker.record_failure();
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::identity::MockIdentityLookup;
    use crate::adapters::resilience::LocalCircuitBreaker;
    use crate::ports::{CircuitBreakerConfig, CircuitState};
    use std::time::Duration;

    fn breaker() -> Arc<LocalCircuitBreaker> {
        Arc::new(LocalCircuitBreaker::new(
            "member-service",
            CircuitBreakerConfig {
                failure_threshold: 2,
                recovery_timeout: Duration::from_secs(60),
                success_threshold: 1,
            },
        ))
    }

    #[tokio::test]
    async fn open_circuit_rejects_without_calling_service() {
        let mock = Arc::new(MockIdentityLookup::failing(IdentityError::Unavailable("down".into())));
        let cb = breaker();
        let lookup = CircuitBreakingIdentityLookup::new(mock.clone(), cb.clone());

        for _ in 0..2 {
            assert!(lookup.student_info("Bearer t").await.is_err());
        }
        assert_eq!(cb.state(), CircuitState::Open);

        let err = lookup.student_info("Bearer t").await.unwrap_err();
        assert_eq!(err, IdentityError::Unavailable("circuit open".into()));
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn forbidden_does_not_trip_breaker() {
        let mock = Arc::new(MockIdentityLookup::failing(IdentityError::Forbidden));
        let cb = breaker();
        let lookup = CircuitBreakingIdentityLookup::new(mock, cb.clone());

        for _ in 0..5 {
            assert_eq!(lookup.student_info("t").await.unwrap_err(), IdentityError::Forbidden);
        }
        assert_eq!(cb.state(), CircuitState::Closed);
    }
}
