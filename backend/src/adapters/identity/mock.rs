//! Scriptable IdentityLookup for tests.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::domain::schedule::MemberIdentity;
use crate::ports::{IdentityError, IdentityLookup};

/// Resolves tokens from a fixed table, or fails every call.
pub struct MockIdentityLookup {
    identities: Mutex<HashMap<String, MemberIdentity>>,
    failure: Option<IdentityError>,
    calls: AtomicUsize,
}

impl MockIdentityLookup {
    pub fn new() -> Self {
        Self {
            identities: Mutex::new(HashMap::new()),
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: IdentityError) -> Self {
        Self {
            failure: Some(error),
            ..Self::new()
        }
    }

    pub fn with_identity(self, token: impl Into<String>, identity: MemberIdentity) -> Self {
        if let Ok(mut identities) = self.identities.lock() {
            identities.insert(token.into(), identity);
        }
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockIdentityLookup {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityLookup for MockIdentityLookup {
    async fn student_info(&self, auth_token: &str) -> Result<MemberIdentity, IdentityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = &self.failure {
            return Err(error.clone());
        }

        self.identities
            .lock()
            .map_err(|_| IdentityError::Unavailable("mock poisoned".to_string()))?
            .get(auth_token)
            .cloned()
            .ok_or(IdentityError::NotFound)
    }
}
