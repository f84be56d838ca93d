//! PostgreSQL implementation of BookingOutcomeStore.

use crate::domain::foundation::{BookingId, DomainError, ErrorCode, IdempotencyKey};
use crate::ports::{BookingOutcome, BookingOutcomeStore};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

pub struct PostgresBookingOutcomeStore {
    pool: PgPool,
}

impl PostgresBookingOutcomeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OutcomeRow {
    status: String,
    booking_id: Option<Uuid>,
    reason: Option<String>,
}

impl TryFrom<OutcomeRow> for BookingOutcome {
    type Error = DomainError;

    fn try_from(row: OutcomeRow) -> Result<Self, Self::Error> {
        match (row.status.as_str(), row.booking_id) {
            ("accepted", Some(id)) => Ok(BookingOutcome::Accepted {
                booking_id: BookingId::from_uuid(id),
            }),
            ("rejected", _) => Ok(BookingOutcome::Rejected {
                reason: row.reason.unwrap_or_default(),
            }),
            (status, _) => Err(DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid booking outcome row with status: {}", status),
            )),
        }
    }
}

#[async_trait]
impl BookingOutcomeStore for PostgresBookingOutcomeStore {
    async fn record(
        &self,
        key: &IdempotencyKey,
        outcome: &BookingOutcome,
    ) -> Result<(), DomainError> {
        let (status, booking_id, reason) = match outcome {
            BookingOutcome::Accepted { booking_id } => {
                ("accepted", Some(*booking_id.as_uuid()), None)
            }
            BookingOutcome::Rejected { reason } => ("rejected", None, Some(reason.as_str())),
        };

        sqlx::query(
            r#"
            INSERT INTO booking_outcomes (idempotency_key, status, booking_id, reason, recorded_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (idempotency_key) DO UPDATE SET
                status = EXCLUDED.status,
                booking_id = EXCLUDED.booking_id,
                reason = EXCLUDED.reason,
                recorded_at = EXCLUDED.recorded_at
            "#,
        )
        .bind(key.as_str())
        .bind(status)
        .bind(booking_id)
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to record booking outcome", e))?;

        Ok(())
    }

    async fn find(&self, key: &IdempotencyKey) -> Result<Option<BookingOutcome>, DomainError> {
        let row: Option<OutcomeRow> = sqlx::query_as(
            "SELECT status, booking_id, reason FROM booking_outcomes WHERE idempotency_key = $1",
        )
        .bind(key.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to find booking outcome", e))?;

        row.map(BookingOutcome::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_row_requires_booking_id() {
        let row = OutcomeRow {
            status: "accepted".to_string(),
            booking_id: None,
            reason: None,
        };
        assert!(BookingOutcome::try_from(row).is_err());
    }

    #[test]
    fn rejected_row_carries_reason() {
        let row = OutcomeRow {
            status: "rejected".to_string(),
            booking_id: None,
            reason: Some("MONDAY hour 3 taken".to_string()),
        };
        assert_eq!(
            BookingOutcome::try_from(row).unwrap(),
            BookingOutcome::Rejected {
                reason: "MONDAY hour 3 taken".to_string()
            }
        );
    }
}
