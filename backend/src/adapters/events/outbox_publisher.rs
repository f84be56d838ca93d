//! OutboxPublisher - records an intent, then hands it to the relay.
//!
//! First half of the Transactional Outbox Pattern. The record is durable
//! once `publish` returns; delivery to the broker happens afterwards and
//! never affects the caller's result.
//!
//! Callers that also perform a business write open their own transaction,
//! write the record with `PostgresOutboxWriter::write_in_txn`, commit, and
//! then pass the record to [`OutboxPublisher::committed`].

use std::sync::Arc;

use serde::Serialize;

use crate::domain::foundation::{DomainError, EventType, IdempotencyKey};
use crate::ports::{OutboxRecord, OutboxWriter};

use super::MessageRelay;

pub struct OutboxPublisher {
    outbox: Arc<dyn OutboxWriter>,
    relay: Arc<MessageRelay>,
}

impl OutboxPublisher {
    pub fn new(outbox: Arc<dyn OutboxWriter>, relay: Arc<MessageRelay>) -> Self {
        Self { outbox, relay }
    }

    /// Serializes `payload` into a new outbox record and commits it.
    ///
    /// A fresh idempotency key is generated when `idempotency_key` is `None`.
    pub async fn publish<T: Serialize + Sync>(
        &self,
        event_type: EventType,
        payload: &T,
        idempotency_key: Option<IdempotencyKey>,
    ) -> Result<OutboxRecord, DomainError> {
        let payload = serde_json::to_string(payload)?;
        let record = OutboxRecord::new(event_type, payload, idempotency_key);

        self.outbox.write(&record).await?;
        tracing::debug!(
            outbox_id = %record.id,
            idempotency_key = %record.idempotency_key,
            event_type = %record.event_type,
            "Outbox record written"
        );

        self.committed(record.clone());
        Ok(record)
    }

    /// Triggers the best-effort immediate publish of a committed record.
    pub fn committed(&self, record: OutboxRecord) {
        self.relay.spawn_immediate(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::in_memory::{InMemoryBroker, InMemoryOutbox};
    use crate::config::RelayConfig;
    use crate::ports::MessagePublisher;
    use serde_json::json;
    use std::time::Duration;

    const TOPIC: &str = "course-created";

    fn setup() -> (Arc<InMemoryOutbox>, Arc<InMemoryBroker>, OutboxPublisher) {
        let outbox = Arc::new(InMemoryOutbox::new());
        let broker = Arc::new(InMemoryBroker::new());
        let publisher: Arc<dyn MessagePublisher> = broker.clone();
        let relay = Arc::new(MessageRelay::new(
            outbox.clone(),
            publisher,
            TOPIC,
            RelayConfig::default(),
        ));
        let outbox_publisher = OutboxPublisher::new(outbox.clone(), relay);
        (outbox, broker, outbox_publisher)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn publish_writes_record_and_relays_it() {
        let (outbox, broker, publisher) = setup();

        let record = publisher
            .publish(EventType::Created, &json!({"teacherId": "t-1"}), None)
            .await
            .unwrap();
        settle().await;

        let sent = broker.sent_to(TOPIC).await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].idempotency_key(), Some(record.idempotency_key.as_str()));
        assert!(outbox.is_empty().await);
    }

    #[tokio::test]
    async fn broker_outage_leaves_record_for_sweep() {
        let (outbox, broker, publisher) = setup();
        broker.set_failing(true);

        let result = publisher
            .publish(EventType::Created, &json!({"teacherId": "t-1"}), None)
            .await;
        settle().await;

        assert!(result.is_ok());
        assert_eq!(outbox.len().await, 1);
    }

    #[tokio::test]
    async fn outbox_failure_is_reported() {
        let (outbox, broker, publisher) = setup();
        outbox.set_unavailable(true);

        let result = publisher
            .publish(EventType::Created, &json!({"teacherId": "t-1"}), None)
            .await;
        settle().await;

        assert!(result.is_err());
        assert!(broker.sent_to(TOPIC).await.is_empty());
    }

    #[tokio::test]
    async fn reused_key_is_rejected() {
        let (_outbox, broker, publisher) = setup();
        broker.set_failing(true);
        let key = IdempotencyKey::from_string("client-key").unwrap();

        publisher
            .publish(EventType::Created, &json!({}), Some(key.clone()))
            .await
            .unwrap();
        let second = publisher
            .publish(EventType::Created, &json!({}), Some(key))
            .await;

        assert!(second.is_err());
    }
}
