//! OutboxWriter port - Interface for transactional intent persistence.
//!
//! Implements the Transactional Outbox Pattern: a booking intent is stored
//! in the same transaction as the local change that produced it, so it can
//! never be lost between commit and publish.
//!
//! ## Pattern Overview
//!
//! 1. The request handler writes the outbox record (and any business rows)
//!    in one transaction
//! 2. After commit, the MessageRelay publishes the record and deletes it
//! 3. A periodic sweep republishes whatever is still in the table

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, EventType, IdempotencyKey, OutboxId, Timestamp};

/// A row in the outbox table.
///
/// Write-once: the only later mutation is deletion after a confirmed publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxRecord {
    pub id: OutboxId,

    /// Unique per record and stable across every publish attempt
    pub idempotency_key: IdempotencyKey,

    pub event_type: EventType,

    /// Serialized JSON payload
    pub payload: String,

    pub created_at: Timestamp,
}

impl OutboxRecord {
    /// Creates a new record, generating an idempotency key if none is given.
    pub fn new(
        event_type: EventType,
        payload: impl Into<String>,
        idempotency_key: Option<IdempotencyKey>,
    ) -> Self {
        Self {
            id: OutboxId::new(),
            idempotency_key: idempotency_key.unwrap_or_default(),
            event_type,
            payload: payload.into(),
            created_at: Timestamp::now(),
        }
    }
}

/// Port for the outbox table.
///
/// Implementations should:
/// - Enforce uniqueness of `idempotency_key`
/// - Return pending records oldest first
/// - Treat deleting an already-deleted record as success
#[async_trait]
pub trait OutboxWriter: Send + Sync {
    /// Writes a record in its own transaction.
    ///
    /// Adapters backed by a relational store also expose a variant that
    /// joins a caller's open transaction.
    async fn write(&self, record: &OutboxRecord) -> Result<(), DomainError>;

    /// Records still awaiting a confirmed publish, oldest first.
    async fn pending(&self, limit: u32) -> Result<Vec<OutboxRecord>, DomainError>;

    /// Removes a record once the broker has accepted it.
    async fn delete(&self, id: OutboxId) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_generates_key_when_absent() {
        let a = OutboxRecord::new(EventType::Created, "{}", None);
        let b = OutboxRecord::new(EventType::Created, "{}", None);
        assert_ne!(a.idempotency_key, b.idempotency_key);
    }

    #[test]
    fn new_record_keeps_supplied_key() {
        let key = IdempotencyKey::from_string("client-key-1").unwrap();
        let record = OutboxRecord::new(EventType::Created, "{}", Some(key.clone()));
        assert_eq!(record.idempotency_key, key);
    }
}
