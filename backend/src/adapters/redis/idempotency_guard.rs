//! Redis-backed IdempotencyGuard.
//!
//! Claims are `SET idem:{key} 1 NX EX {ttl}`: the first caller creates the
//! key, every later caller sees it already present. The TTL bounds memory
//! while covering any realistic redelivery window.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::time::Duration;

use crate::domain::foundation::{DomainError, IdempotencyKey};
use crate::ports::IdempotencyGuard;

#[derive(Clone)]
pub struct RedisIdempotencyGuard {
    conn: MultiplexedConnection,
    ttl: Duration,
}

impl RedisIdempotencyGuard {
    pub fn new(conn: MultiplexedConnection, ttl: Duration) -> Self {
        Self { conn, ttl }
    }

    fn redis_key(key: &IdempotencyKey) -> String {
        format!("idem:{}", key.as_str())
    }
}

#[async_trait]
impl IdempotencyGuard for RedisIdempotencyGuard {
    async fn claim(&self, key: &IdempotencyKey) -> Result<bool, DomainError> {
        let mut conn = self.conn.clone();

        // Nil reply means the key already existed
        let reply: Option<String> = redis::cmd("SET")
            .arg(Self::redis_key(key))
            .arg("1")
            .arg("NX")
            .arg("EX")
            .arg(self.ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await
            .map_err(|e: redis::RedisError| DomainError::cache("Failed to claim idempotency key", e))?;

        Ok(reply.is_some())
    }

    async fn release(&self, key: &IdempotencyKey) -> Result<(), DomainError> {
        let mut conn = self.conn.clone();

        conn.del::<_, ()>(Self::redis_key(key))
            .await
            .map_err(|e: redis::RedisError| DomainError::cache("Failed to release idempotency key", e))?;

        tracing::debug!(idempotency_key = %key, "Released idempotency claim");
        Ok(())
    }
}
