//! GetBookingStatusHandler - Query handler for the asynchronous decision.

use serde::Serialize;
use std::sync::Arc;

use crate::domain::foundation::{BookingId, DomainError, IdempotencyKey};
use crate::ports::{BookingOutcome, BookingOutcomeStore};

/// Query by the idempotency key returned when the request was accepted.
#[derive(Debug, Clone)]
pub struct GetBookingStatusQuery {
    pub idempotency_key: IdempotencyKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    /// Not yet consumed, or the key is unknown
    Pending,
    #[serde(rename_all = "camelCase")]
    Accepted { booking_id: BookingId },
    Rejected { reason: String },
}

impl From<BookingOutcome> for BookingStatus {
    fn from(outcome: BookingOutcome) -> Self {
        match outcome {
            BookingOutcome::Accepted { booking_id } => BookingStatus::Accepted { booking_id },
            BookingOutcome::Rejected { reason } => BookingStatus::Rejected { reason },
        }
    }
}

pub struct GetBookingStatusHandler {
    outcomes: Arc<dyn BookingOutcomeStore>,
}

impl GetBookingStatusHandler {
    pub fn new(outcomes: Arc<dyn BookingOutcomeStore>) -> Self {
        Self { outcomes }
    }

    pub async fn handle(&self, query: GetBookingStatusQuery) -> Result<BookingStatus, DomainError> {
        Ok(self
            .outcomes
            .find(&query.idempotency_key)
            .await?
            .map(BookingStatus::from)
            .unwrap_or(BookingStatus::Pending))
    }
}
