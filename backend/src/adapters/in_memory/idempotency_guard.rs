//! In-memory IdempotencyGuard. Claims never expire.

use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::Mutex;

use crate::domain::foundation::{DomainError, IdempotencyKey};
use crate::ports::IdempotencyGuard;

#[derive(Default)]
pub struct InMemoryIdempotencyGuard {
    claimed: Mutex<HashSet<IdempotencyKey>>,
}

impl InMemoryIdempotencyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_claimed(&self, key: &IdempotencyKey) -> bool {
        self.claimed.lock().await.contains(key)
    }
}

#[async_trait]
impl IdempotencyGuard for InMemoryIdempotencyGuard {
    async fn claim(&self, key: &IdempotencyKey) -> Result<bool, DomainError> {
        Ok(self.claimed.lock().await.insert(key.clone()))
    }

    async fn release(&self, key: &IdempotencyKey) -> Result<(), DomainError> {
        self.claimed.lock().await.remove(key);
        Ok(())
    }
}
