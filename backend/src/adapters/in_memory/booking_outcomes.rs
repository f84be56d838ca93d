//! In-memory BookingOutcomeStore.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::domain::foundation::{DomainError, IdempotencyKey};
use crate::ports::{BookingOutcome, BookingOutcomeStore};

#[derive(Default)]
pub struct InMemoryBookingOutcomeStore {
    outcomes: Mutex<HashMap<IdempotencyKey, BookingOutcome>>,
}

impl InMemoryBookingOutcomeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<BookingOutcome> {
        self.outcomes.lock().await.values().cloned().collect()
    }
}

#[async_trait]
impl BookingOutcomeStore for InMemoryBookingOutcomeStore {
    async fn record(
        &self,
        key: &IdempotencyKey,
        outcome: &BookingOutcome,
    ) -> Result<(), DomainError> {
        self.outcomes
            .lock()
            .await
            .insert(key.clone(), outcome.clone());
        Ok(())
    }

    async fn find(&self, key: &IdempotencyKey) -> Result<Option<BookingOutcome>, DomainError> {
        Ok(self.outcomes.lock().await.get(key).cloned())
    }
}
