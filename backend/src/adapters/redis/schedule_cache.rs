//! Redis-backed ScheduleCache.
//!
//! Each teacher week is one JSON string under `WeekKey::to_redis_key`, with
//! a TTL bounding how long an entry can outlive a missed invalidation.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::time::Duration;

use crate::domain::foundation::DomainError;
use crate::domain::schedule::{Booking, WeekKey};
use crate::ports::ScheduleCache;

#[derive(Clone)]
pub struct RedisScheduleCache {
    conn: MultiplexedConnection,
    ttl: Duration,
}

impl RedisScheduleCache {
    pub fn new(conn: MultiplexedConnection, ttl: Duration) -> Self {
        Self { conn, ttl }
    }
}

#[async_trait]
impl ScheduleCache for RedisScheduleCache {
    async fn get(&self, key: &WeekKey) -> Result<Option<Vec<Booking>>, DomainError> {
        let mut conn = self.conn.clone();

        let raw: Option<String> = conn
            .get(key.to_redis_key())
            .await
            .map_err(|e: redis::RedisError| DomainError::cache("Failed to read schedule cache", e))?;

        match raw {
            Some(json) => match serde_json::from_str(&json) {
                Ok(bookings) => Ok(Some(bookings)),
                Err(e) => {
                    // Unreadable entries are treated as a miss and rebuilt
                    tracing::warn!(cache_key = %key, error = %e, "Discarding unreadable cache entry");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    async fn put(&self, key: &WeekKey, bookings: &[Booking]) -> Result<(), DomainError> {
        let json = serde_json::to_string(bookings)?;
        let mut conn = self.conn.clone();

        redis::cmd("SET")
            .arg(key.to_redis_key())
            .arg(json)
            .arg("EX")
            .arg(self.ttl.as_secs().max(1))
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e: redis::RedisError| DomainError::cache("Failed to write schedule cache", e))?;

        Ok(())
    }

    async fn invalidate(&self, key: &WeekKey) -> Result<(), DomainError> {
        let mut conn = self.conn.clone();

        conn.del::<_, ()>(key.to_redis_key())
            .await
            .map_err(|e: redis::RedisError| DomainError::cache("Failed to invalidate schedule cache", e))?;

        Ok(())
    }
}
