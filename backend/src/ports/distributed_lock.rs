//! DistributedLock port - lease-based mutual exclusion across processes.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::foundation::{DomainError, TeacherId};

/// Proof of ownership of a lock.
///
/// The token is unique per acquisition; releasing only succeeds while the
/// lease is still held with the same token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockHandle {
    pub resource: String,
    pub token: String,
}

/// Lock resource serializing all booking writes of one teacher.
pub fn teacher_lock_key(teacher_id: &TeacherId) -> String {
    format!("lock:{}", teacher_id.as_str())
}

/// Port for a lease-based lock.
#[async_trait]
pub trait DistributedLock: Send + Sync {
    /// Tries to acquire `resource` for at most `wait`.
    ///
    /// Returns `None` when the wait elapsed without acquiring. A granted
    /// lock expires after `lease` even if never released.
    async fn try_acquire(
        &self,
        resource: &str,
        wait: Duration,
        lease: Duration,
    ) -> Result<Option<LockHandle>, DomainError>;

    /// Releases the lock if still held by this handle.
    ///
    /// Returns `false` when the lease had already expired.
    async fn release(&self, handle: &LockHandle) -> Result<bool, DomainError>;
}
