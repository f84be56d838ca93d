//! In-memory ScheduleCache.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::domain::foundation::DomainError;
use crate::domain::schedule::{Booking, WeekKey};
use crate::ports::ScheduleCache;

#[derive(Default)]
pub struct InMemoryScheduleCache {
    entries: Mutex<HashMap<WeekKey, Vec<Booking>>>,
}

impl InMemoryScheduleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, key: &WeekKey) -> bool {
        self.entries.lock().await.contains_key(key)
    }
}

#[async_trait]
impl ScheduleCache for InMemoryScheduleCache {
    async fn get(&self, key: &WeekKey) -> Result<Option<Vec<Booking>>, DomainError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn put(&self, key: &WeekKey, bookings: &[Booking]) -> Result<(), DomainError> {
        self.entries
            .lock()
            .await
            .insert(key.clone(), bookings.to_vec());
        Ok(())
    }

    async fn invalidate(&self, key: &WeekKey) -> Result<(), DomainError> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}
