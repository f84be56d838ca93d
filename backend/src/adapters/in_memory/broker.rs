//! In-memory broker with at-least-once semantics.
//!
//! Messages handed out by `poll_batch` stay in flight until acked. A
//! nacked message goes back to the end of the queue with its delivery
//! count preserved, which is how tests exercise redelivery.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use crate::domain::foundation::DomainError;
use crate::ports::{BrokerMessage, DeliveredMessage, DeliveryId, MessagePublisher, MessageSource};

#[derive(Default)]
struct TopicState {
    next_id: u64,
    ready: VecDeque<DeliveredMessage>,
    in_flight: HashMap<DeliveryId, DeliveredMessage>,
    acked: usize,
}

#[derive(Default)]
pub struct InMemoryBroker {
    topics: Mutex<HashMap<String, TopicState>>,
    sent: Mutex<Vec<(String, BrokerMessage)>>,
    failing: AtomicBool,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `send` fail, simulating a broker outage.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every message accepted for a topic, in send order.
    pub async fn sent_to(&self, topic: &str) -> Vec<BrokerMessage> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub async fn in_flight(&self, topic: &str) -> usize {
        self.topics
            .lock()
            .await
            .get(topic)
            .map(|t| t.in_flight.len())
            .unwrap_or(0)
    }

    pub async fn acked(&self, topic: &str) -> usize {
        self.topics
            .lock()
            .await
            .get(topic)
            .map(|t| t.acked)
            .unwrap_or(0)
    }
}

#[async_trait]
impl MessagePublisher for InMemoryBroker {
    async fn send(&self, topic: &str, message: &BrokerMessage) -> Result<(), DomainError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DomainError::broker("Failed to publish message", "broker unavailable"));
        }

        let mut topics = self.topics.lock().await;
        let state = topics.entry(topic.to_string()).or_default();
        state.next_id += 1;
        state.ready.push_back(DeliveredMessage {
            id: DeliveryId::new(format!("{}-{}", topic, state.next_id)),
            message: message.clone(),
            delivery_count: 0,
        });
        drop(topics);

        self.sent
            .lock()
            .await
            .push((topic.to_string(), message.clone()));
        Ok(())
    }
}

#[async_trait]
impl MessageSource for InMemoryBroker {
    async fn poll_batch(
        &self,
        topic: &str,
        max: usize,
    ) -> Result<Vec<DeliveredMessage>, DomainError> {
        let mut topics = self.topics.lock().await;
        let state = topics.entry(topic.to_string()).or_default();

        let mut batch = Vec::new();
        while batch.len() < max {
            let Some(mut delivered) = state.ready.pop_front() else {
                break;
            };
            delivered.delivery_count += 1;
            state.in_flight.insert(delivered.id.clone(), delivered.clone());
            batch.push(delivered);
        }
        Ok(batch)
    }

    async fn ack(&self, topic: &str, ids: &[DeliveryId]) -> Result<(), DomainError> {
        let mut topics = self.topics.lock().await;
        if let Some(state) = topics.get_mut(topic) {
            for id in ids {
                if state.in_flight.remove(id).is_some() {
                    state.acked += 1;
                }
            }
        }
        Ok(())
    }

    async fn nack(&self, topic: &str, ids: &[DeliveryId]) -> Result<(), DomainError> {
        let mut topics = self.topics.lock().await;
        if let Some(state) = topics.get_mut(topic) {
            for id in ids {
                if let Some(delivered) = state.in_flight.remove(id) {
                    state.ready.push_back(delivered);
                }
            }
        }
        Ok(())
    }
}
