//! IdentityLookup port - resolves a caller's token to student and teacher.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::schedule::MemberIdentity;

/// Failures reported by the member service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("invalid identity request: {0}")]
    InvalidRequest(String),

    #[error("caller is not allowed to book")]
    Forbidden,

    #[error("member not found")]
    NotFound,

    #[error("identity service unavailable: {0}")]
    Unavailable(String),
}

impl IdentityError {
    /// Whether the failure counts against the circuit breaker.
    pub fn is_dependency_fault(&self) -> bool {
        matches!(self, IdentityError::Unavailable(_))
    }
}

#[async_trait]
pub trait IdentityLookup: Send + Sync {
    /// Looks up the student behind `auth_token` and their assigned teacher.
    async fn student_info(&self, auth_token: &str) -> Result<MemberIdentity, IdentityError>;
}
