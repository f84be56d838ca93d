//! IdempotencyGuard port - claim-once gate for redelivered messages.
//!
//! The broker delivers at least once. Claiming a message's idempotency key
//! before applying it turns that into effectively-once processing.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, IdempotencyKey};

/// Port for claiming idempotency keys.
///
/// # Example
///
/// ```ignore
/// if !guard.claim(&key).await? {
///     return Ok(MessageOutcome::Duplicate);
/// }
/// ```
#[async_trait]
pub trait IdempotencyGuard: Send + Sync {
    /// Atomically claims the key.
    ///
    /// Returns `true` exactly once per key until the claim expires or is
    /// released, `false` on every later call.
    async fn claim(&self, key: &IdempotencyKey) -> Result<bool, DomainError>;

    /// Gives a claim back so a redelivery of the same message is processed.
    ///
    /// Only called when processing stopped before any effect was applied.
    async fn release(&self, key: &IdempotencyKey) -> Result<(), DomainError>;
}
