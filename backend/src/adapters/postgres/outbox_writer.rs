//! PostgreSQL implementation of OutboxWriter.
//!
//! `write_in_txn` joins a caller's open transaction so an intent commits
//! or rolls back together with the business rows that produced it.

use crate::domain::foundation::{
    DomainError, ErrorCode, EventType, IdempotencyKey, OutboxId, Timestamp,
};
use crate::ports::{OutboxRecord, OutboxWriter};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

pub struct PostgresOutboxWriter {
    pool: PgPool,
}

impl PostgresOutboxWriter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Writes a record inside an existing transaction.
    ///
    /// The record becomes visible to the relay only when the caller commits.
    pub async fn write_in_txn(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        record: &OutboxRecord,
    ) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO outbox (id, idempotency_key, event_type, payload, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.idempotency_key.as_str())
        .bind(record.event_type.as_str())
        .bind(&record.payload)
        .bind(record.created_at.as_datetime())
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("outbox_idempotency_key_key") {
                    return DomainError::new(
                        ErrorCode::ValidationFailed,
                        format!(
                            "Idempotency key {} was already used",
                            record.idempotency_key
                        ),
                    );
                }
            }
            DomainError::database("Failed to write outbox record", e)
        })?;

        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OutboxRow {
    id: Uuid,
    idempotency_key: String,
    event_type: String,
    payload: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<OutboxRow> for OutboxRecord {
    type Error = DomainError;

    fn try_from(row: OutboxRow) -> Result<Self, Self::Error> {
        let invalid = |e: crate::domain::foundation::ValidationError| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid outbox row: {}", e))
        };

        Ok(OutboxRecord {
            id: OutboxId::from_uuid(row.id),
            idempotency_key: IdempotencyKey::from_string(row.idempotency_key).map_err(invalid)?,
            event_type: row.event_type.parse::<EventType>().map_err(invalid)?,
            payload: row.payload,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

#[async_trait]
impl OutboxWriter for PostgresOutboxWriter {
    async fn write(&self, record: &OutboxRecord) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database("Failed to start transaction", e))?;

        self.write_in_txn(&mut tx, record).await?;

        tx.commit()
            .await
            .map_err(|e| DomainError::database("Failed to commit outbox record", e))?;

        Ok(())
    }

    async fn pending(&self, limit: u32) -> Result<Vec<OutboxRecord>, DomainError> {
        let rows: Vec<OutboxRow> = sqlx::query_as(
            r#"
            SELECT id, idempotency_key, event_type, payload, created_at
            FROM outbox
            ORDER BY created_at ASC
            LIMIT $1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to load pending outbox records", e))?;

        rows.into_iter().map(OutboxRecord::try_from).collect()
    }

    async fn delete(&self, id: OutboxId) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM outbox WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to delete outbox record", e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_with_unknown_event_type_is_rejected() {
        let row = OutboxRow {
            id: Uuid::new_v4(),
            idempotency_key: "k".to_string(),
            event_type: "DELETED".to_string(),
            payload: "{}".to_string(),
            created_at: Utc::now(),
        };
        assert!(OutboxRecord::try_from(row).is_err());
    }

    #[test]
    fn row_converts_to_record() {
        let row = OutboxRow {
            id: Uuid::new_v4(),
            idempotency_key: "key-1".to_string(),
            event_type: "CREATED".to_string(),
            payload: r#"{"teacherId":"t"}"#.to_string(),
            created_at: Utc::now(),
        };
        let record = OutboxRecord::try_from(row).unwrap();
        assert_eq!(record.event_type, EventType::Created);
        assert_eq!(record.idempotency_key.as_str(), "key-1");
    }
}
