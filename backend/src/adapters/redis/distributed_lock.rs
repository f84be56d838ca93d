//! Redis-backed DistributedLock.
//!
//! Acquire is `SET {resource} {token} NX PX {lease}`, retried until the wait
//! timeout. Release deletes the key only if it still holds our token, in a
//! single Lua script, so an expired lease taken over by another holder is
//! never released by mistake.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use crate::domain::foundation::DomainError;
use crate::ports::{DistributedLock, LockHandle};

const RELEASE_SCRIPT: &str = r#"
    if redis.call('GET', KEYS[1]) == ARGV[1] then
        return redis.call('DEL', KEYS[1])
    else
        return 0
    end
"#;

#[derive(Clone)]
pub struct RedisDistributedLock {
    conn: MultiplexedConnection,
    retry_interval: Duration,
}

impl RedisDistributedLock {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self {
            conn,
            retry_interval: Duration::from_millis(50),
        }
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    async fn try_set(&self, resource: &str, token: &str, lease: Duration) -> Result<bool, DomainError> {
        let mut conn = self.conn.clone();

        let reply: Option<String> = redis::cmd("SET")
            .arg(resource)
            .arg(token)
            .arg("NX")
            .arg("PX")
            .arg(lease.as_millis().max(1) as u64)
            .query_async(&mut conn)
            .await
            .map_err(|e: redis::RedisError| DomainError::cache("Failed to acquire lock", e))?;

        Ok(reply.is_some())
    }
}

#[async_trait]
impl DistributedLock for RedisDistributedLock {
    async fn try_acquire(
        &self,
        resource: &str,
        wait: Duration,
        lease: Duration,
    ) -> Result<Option<LockHandle>, DomainError> {
        let token = Uuid::new_v4().to_string();
        let deadline = Instant::now() + wait;

        loop {
            if self.try_set(resource, &token, lease).await? {
                return Ok(Some(LockHandle {
                    resource: resource.to_string(),
                    token,
                }));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(self.retry_interval.min(deadline - now)).await;
        }
    }

    async fn release(&self, handle: &LockHandle) -> Result<bool, DomainError> {
        let mut conn = self.conn.clone();

        let script = redis::Script::new(RELEASE_SCRIPT);
        let deleted: i64 = script
            .key(&handle.resource)
            .arg(&handle.token)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| DomainError::cache("Failed to release lock", e))?;

        Ok(deleted == 1)
    }
}
