//! BookingOutcomeStore port - terminal result of each consumed intent.
//!
//! Booking requests are accepted asynchronously; this store is how a
//! client later learns whether its request was applied or rejected.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{BookingId, DomainError, IdempotencyKey};

/// Result of processing one booking intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingOutcome {
    Accepted { booking_id: BookingId },
    Rejected { reason: String },
}

#[async_trait]
pub trait BookingOutcomeStore: Send + Sync {
    /// Records the outcome for a key. Recording again overwrites.
    async fn record(
        &self,
        key: &IdempotencyKey,
        outcome: &BookingOutcome,
    ) -> Result<(), DomainError>;

    async fn find(&self, key: &IdempotencyKey) -> Result<Option<BookingOutcome>, DomainError>;
}
