//! In-memory DistributedLock with lease expiry.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

use crate::domain::foundation::DomainError;
use crate::ports::{DistributedLock, LockHandle};

struct Lease {
    token: String,
    expires_at: Instant,
}

#[derive(Default)]
pub struct InMemoryDistributedLock {
    leases: Mutex<HashMap<String, Lease>>,
}

impl InMemoryDistributedLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Holds `resource` for `lease` on behalf of an outside holder.
    pub async fn hold(&self, resource: &str, lease: Duration) -> LockHandle {
        let token = Uuid::new_v4().to_string();
        self.leases.lock().await.insert(
            resource.to_string(),
            Lease {
                token: token.clone(),
                expires_at: Instant::now() + lease,
            },
        );
        LockHandle {
            resource: resource.to_string(),
            token,
        }
    }

    async fn try_take(&self, resource: &str, token: &str, lease: Duration) -> bool {
        let mut leases = self.leases.lock().await;
        let now = Instant::now();

        if let Some(current) = leases.get(resource) {
            if current.expires_at > now {
                return false;
            }
        }

        leases.insert(
            resource.to_string(),
            Lease {
                token: token.to_string(),
                expires_at: now + lease,
            },
        );
        true
    }
}

#[async_trait]
impl DistributedLock for InMemoryDistributedLock {
    async fn try_acquire(
        &self,
        resource: &str,
        wait: Duration,
        lease: Duration,
    ) -> Result<Option<LockHandle>, DomainError> {
        let token = Uuid::new_v4().to_string();
        let deadline = Instant::now() + wait;

        loop {
            if self.try_take(resource, &token, lease).await {
                return Ok(Some(LockHandle {
                    resource: resource.to_string(),
                    token,
                }));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    async fn release(&self, handle: &LockHandle) -> Result<bool, DomainError> {
        let mut leases = self.leases.lock().await;
        match leases.get(&handle.resource) {
            Some(current) if current.token == handle.token => {
                leases.remove(&handle.resource);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
