//! Message broker ports - at-least-once publish and batch consumption.
//!
//! The broker may deliver a message more than once. Consumers acknowledge
//! a batch only after every message in it reached a terminal outcome; an
//! unacknowledged message is redelivered.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::foundation::{DomainError, EVENT_TYPE_HEADER, IDEMPOTENCY_KEY_HEADER};

/// Message as sent to a topic: headers plus a JSON payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BrokerMessage {
    pub headers: BTreeMap<String, String>,
    pub payload: String,
}

impl BrokerMessage {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            headers: BTreeMap::new(),
            payload: payload.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn idempotency_key(&self) -> Option<&str> {
        self.header(IDEMPOTENCY_KEY_HEADER)
    }

    pub fn event_type(&self) -> Option<&str> {
        self.header(EVENT_TYPE_HEADER)
    }
}

/// Broker-assigned identity of one delivery, used for acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeliveryId(String);

impl DeliveryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeliveryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message handed to a consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredMessage {
    pub id: DeliveryId,
    pub message: BrokerMessage,
    /// 1 on first delivery
    pub delivery_count: u32,
}

/// Port for sending messages to a topic.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Returns only after the broker has durably accepted the message.
    async fn send(&self, topic: &str, message: &BrokerMessage) -> Result<(), DomainError>;
}

/// Port for consuming batches from a topic as a member of a consumer group.
#[async_trait]
pub trait MessageSource: Send + Sync {
    /// Next batch for this consumer, at most `max` messages.
    ///
    /// Includes earlier deliveries that were never acknowledged and are due
    /// for redelivery. May return an empty batch.
    async fn poll_batch(&self, topic: &str, max: usize)
        -> Result<Vec<DeliveredMessage>, DomainError>;

    /// Acknowledges deliveries; they will not be redelivered.
    async fn ack(&self, topic: &str, ids: &[DeliveryId]) -> Result<(), DomainError>;

    /// Hands deliveries back for redelivery.
    ///
    /// Brokers that redeliver on their own schedule may treat this as a no-op.
    async fn nack(&self, topic: &str, ids: &[DeliveryId]) -> Result<(), DomainError>;
}
