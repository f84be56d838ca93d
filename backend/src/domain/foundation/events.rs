//! Event vocabulary shared by the outbox, the broker and the consumers.
//!
//! - `IdempotencyKey` - Unique identifier for a published event (deduplication)
//! - `EventType` - What happened, carried as a message header
//! - Header names used on every broker message

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ValidationError;

/// Header carrying the idempotency key of a broker message.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Header carrying the event type of a broker message.
pub const EVENT_TYPE_HEADER: &str = "Event-Type";

// ============================================
// IdempotencyKey
// ============================================

/// Unique identifier assigned to an event when it enters the outbox.
///
/// Stays the same across every publish attempt of that event, so consumers
/// can collapse redeliveries. Uses a String internally because keys read
/// back from the broker are opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Creates a new random key using UUID v4.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wraps a key received from elsewhere. Blank keys are rejected.
    pub fn from_string(s: impl Into<String>) -> Result<Self, ValidationError> {
        let s = s.into();
        if s.trim().is_empty() {
            return Err(ValidationError::empty_field("idempotency_key"));
        }
        Ok(Self(s))
    }

    /// Prefixes a client-chosen key with its owner, so two callers picking
    /// the same key never share a guard claim, an outbox row or an outcome.
    pub fn scoped_to(&self, owner: impl fmt::Display) -> Self {
        Self(format!("{}:{}", owner, self.0))
    }

    /// Returns the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for IdempotencyKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================
// EventType
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// A student asked to book a teacher for the current week.
    Created,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Created => "CREATED",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATED" => Ok(EventType::Created),
            other => Err(ValidationError::invalid_format(
                "event_type",
                format!("unknown event type '{}'", other),
            )),
        }
    }
}
