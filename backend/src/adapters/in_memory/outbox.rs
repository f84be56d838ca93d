//! In-memory OutboxWriter.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use crate::domain::foundation::{DomainError, ErrorCode, OutboxId};
use crate::ports::{OutboxRecord, OutboxWriter};

#[derive(Default)]
pub struct InMemoryOutbox {
    records: Mutex<Vec<OutboxRecord>>,
    unavailable: AtomicBool,
}

impl InMemoryOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn records(&self) -> Vec<OutboxRecord> {
        self.records.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl OutboxWriter for InMemoryOutbox {
    async fn write(&self, record: &OutboxRecord) -> Result<(), DomainError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::database("Outbox", "unavailable"));
        }

        let mut records = self.records.lock().await;
        if records
            .iter()
            .any(|r| r.idempotency_key == record.idempotency_key)
        {
            return Err(DomainError::new(
                ErrorCode::ValidationFailed,
                format!("Idempotency key {} was already used", record.idempotency_key),
            ));
        }
        records.push(record.clone());
        Ok(())
    }

    async fn pending(&self, limit: u32) -> Result<Vec<OutboxRecord>, DomainError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::database("Outbox", "unavailable"));
        }
        let records = self.records.lock().await;
        Ok(records.iter().take(limit as usize).cloned().collect())
    }

    async fn delete(&self, id: OutboxId) -> Result<(), DomainError> {
        self.records.lock().await.retain(|r| r.id != id);
        Ok(())
    }
}
