//! Redis Streams message broker.
//!
//! Publishing is `XADD`; consuming is `XREADGROUP` as one consumer of a
//! consumer group, which gives at-least-once delivery:
//!
//! - an entry stays in the group's pending list until `XACK`
//! - pending entries idle for `redelivery_idle` are claimed again (`XCLAIM`)
//! - an entry already delivered `max_deliveries` times is copied to the
//!   dead-letter stream and acknowledged
//!
//! Consuming blocks the connection for up to `block`, so a consumer should
//! own its connection rather than share the application's.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::streams::{
    StreamClaimReply, StreamId, StreamPendingCountReply, StreamReadOptions, StreamReadReply,
};
use redis::AsyncCommands;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio::sync::Mutex;

use crate::config::BrokerConfig;
use crate::domain::foundation::DomainError;
use crate::ports::{BrokerMessage, DeliveredMessage, DeliveryId, MessagePublisher, MessageSource};

const PAYLOAD_FIELD: &str = "payload";
const HEADER_PREFIX: &str = "h:";

pub struct RedisStreamBroker {
    conn: MultiplexedConnection,
    group: String,
    consumer: String,
    block: Duration,
    redelivery_idle: Duration,
    max_deliveries: u32,
    dead_letter_stream: String,
    ready_groups: Mutex<HashSet<String>>,
}

impl RedisStreamBroker {
    pub fn new(conn: MultiplexedConnection, config: &BrokerConfig) -> Self {
        Self {
            conn,
            group: config.consumer_group.clone(),
            consumer: config.consumer_name.clone(),
            block: Duration::from_millis(config.block_ms),
            redelivery_idle: Duration::from_millis(config.redelivery_idle_ms),
            max_deliveries: config.max_deliveries,
            dead_letter_stream: config.dead_letter_stream.clone(),
            ready_groups: Mutex::new(HashSet::new()),
        }
    }

    /// Creates the consumer group once per stream, tolerating an existing one.
    async fn ensure_group(&self, stream: &str) -> Result<(), DomainError> {
        let mut ready = self.ready_groups.lock().await;
        if ready.contains(stream) {
            return Ok(());
        }

        let mut conn = self.conn.clone();
        let created: redis::RedisResult<()> =
            conn.xgroup_create_mkstream(stream, &self.group, "0").await;

        match created {
            Ok(()) => {
                tracing::info!(stream, group = %self.group, "Created consumer group");
            }
            Err(e) if e.code() == Some("BUSYGROUP") => {}
            Err(e) => return Err(DomainError::broker("Failed to create consumer group", e)),
        }

        ready.insert(stream.to_string());
        Ok(())
    }

    /// Claims pending entries that sat unacknowledged for too long.
    async fn reclaim_stale(
        &self,
        stream: &str,
        max: usize,
    ) -> Result<Vec<DeliveredMessage>, DomainError> {
        let mut conn = self.conn.clone();

        let pending: StreamPendingCountReply = conn
            .xpending_count(stream, &self.group, "-", "+", max)
            .await
            .map_err(|e: redis::RedisError| DomainError::broker("Failed to list pending entries", e))?;

        let idle_ms = self.redelivery_idle.as_millis() as usize;
        let previous_deliveries: HashMap<String, usize> = pending
            .ids
            .into_iter()
            .filter(|p| p.last_delivered_ms >= idle_ms)
            .map(|p| (p.id, p.times_delivered))
            .collect();

        if previous_deliveries.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<&str> = previous_deliveries.keys().map(String::as_str).collect();
        let claimed: StreamClaimReply = conn
            .xclaim(stream, &self.group, &self.consumer, idle_ms, ids.as_slice())
            .await
            .map_err(|e: redis::RedisError| DomainError::broker("Failed to claim pending entries", e))?;

        let mut redelivered = Vec::new();
        for entry in claimed.ids {
            let times = previous_deliveries.get(&entry.id).copied().unwrap_or(1) as u32;

            if times >= self.max_deliveries {
                self.dead_letter(stream, &entry, times).await?;
                continue;
            }

            tracing::debug!(stream, entry_id = %entry.id, delivery = times + 1, "Redelivering entry");
            redelivered.push(DeliveredMessage {
                id: DeliveryId::new(entry.id.clone()),
                message: decode(&entry),
                delivery_count: times + 1,
            });
        }

        Ok(redelivered)
    }

    /// Moves a poison entry to the dead-letter stream.
    async fn dead_letter(&self, stream: &str, entry: &StreamId, times: u32) -> Result<(), DomainError> {
        let mut fields = encode(&decode(entry));
        fields.push(("source_stream".to_string(), stream.to_string()));
        fields.push(("source_id".to_string(), entry.id.clone()));
        fields.push(("delivery_count".to_string(), times.to_string()));

        let mut conn = self.conn.clone();
        let _: String = conn
            .xadd(&self.dead_letter_stream, "*", fields.as_slice())
            .await
            .map_err(|e: redis::RedisError| DomainError::broker("Failed to write dead letter", e))?;
        let _: i64 = conn
            .xack(stream, &self.group, &[entry.id.as_str()])
            .await
            .map_err(|e: redis::RedisError| DomainError::broker("Failed to ack dead letter", e))?;

        tracing::error!(
            stream,
            entry_id = %entry.id,
            delivery_count = times,
            dead_letter_stream = %self.dead_letter_stream,
            "Message exceeded max deliveries, moved to dead-letter stream"
        );
        Ok(())
    }

    async fn read_new(
        &self,
        stream: &str,
        max: usize,
        block: bool,
    ) -> Result<Vec<DeliveredMessage>, DomainError> {
        let mut options = StreamReadOptions::default()
            .group(&self.group, &self.consumer)
            .count(max);
        if block {
            options = options.block(self.block.as_millis() as usize);
        }

        let mut conn = self.conn.clone();
        let reply: Option<StreamReadReply> = conn
            .xread_options(&[stream], &[">"], &options)
            .await
            .map_err(|e: redis::RedisError| DomainError::broker("Failed to read stream", e))?;

        Ok(reply
            .into_iter()
            .flat_map(|r| r.keys)
            .flat_map(|k| k.ids)
            .map(|entry| DeliveredMessage {
                id: DeliveryId::new(entry.id.clone()),
                message: decode(&entry),
                delivery_count: 1,
            })
            .collect())
    }
}

/// Stream fields for a message: the payload plus one prefixed field per header.
fn encode(message: &BrokerMessage) -> Vec<(String, String)> {
    let mut fields: Vec<(String, String)> = message
        .headers
        .iter()
        .map(|(name, value)| (format!("{}{}", HEADER_PREFIX, name), value.clone()))
        .collect();
    fields.push((PAYLOAD_FIELD.to_string(), message.payload.clone()));
    fields
}

fn decode(entry: &StreamId) -> BrokerMessage {
    let mut message = BrokerMessage::default();
    for (field, value) in &entry.map {
        let Ok(text) = redis::from_redis_value::<String>(value) else {
            continue;
        };
        if field == PAYLOAD_FIELD {
            message.payload = text;
        } else if let Some(name) = field.strip_prefix(HEADER_PREFIX) {
            message.headers.insert(name.to_string(), text);
        }
    }
    message
}

#[async_trait]
impl MessagePublisher for RedisStreamBroker {
    async fn send(&self, topic: &str, message: &BrokerMessage) -> Result<(), DomainError> {
        let fields = encode(message);
        let mut conn = self.conn.clone();

        let entry_id: String = conn
            .xadd(topic, "*", fields.as_slice())
            .await
            .map_err(|e: redis::RedisError| DomainError::broker("Failed to publish message", e))?;

        tracing::debug!(stream = topic, entry_id = %entry_id, "Published message");
        Ok(())
    }
}

#[async_trait]
impl MessageSource for RedisStreamBroker {
    async fn poll_batch(
        &self,
        topic: &str,
        max: usize,
    ) -> Result<Vec<DeliveredMessage>, DomainError> {
        self.ensure_group(topic).await?;

        let mut batch = self.reclaim_stale(topic, max).await?;
        if batch.len() < max {
            let fresh = self.read_new(topic, max - batch.len(), batch.is_empty()).await?;
            batch.extend(fresh);
        }
        Ok(batch)
    }

    async fn ack(&self, topic: &str, ids: &[DeliveryId]) -> Result<(), DomainError> {
        if ids.is_empty() {
            return Ok(());
        }

        let ids: Vec<&str> = ids.iter().map(DeliveryId::as_str).collect();
        let mut conn = self.conn.clone();
        let _: i64 = conn
            .xack(topic, &self.group, ids.as_slice())
            .await
            .map_err(|e: redis::RedisError| DomainError::broker("Failed to acknowledge messages", e))?;

        Ok(())
    }

    async fn nack(&self, topic: &str, ids: &[DeliveryId]) -> Result<(), DomainError> {
        // Entries stay pending and are reclaimed once idle
        tracing::debug!(stream = topic, count = ids.len(), "Leaving messages pending for redelivery");
        Ok(())
    }
}
