//! Message broker configuration (Redis Streams)

use serde::Deserialize;

use super::error::ValidationError;

/// Stream names and consumer-group delivery settings
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    /// Stream carrying booking intents
    #[serde(default = "default_booking_stream")]
    pub booking_stream: String,

    /// Stream carrying member name changes
    #[serde(default = "default_name_change_stream")]
    pub name_change_stream: String,

    /// Stream receiving messages that exhausted their deliveries
    #[serde(default = "default_dead_letter_stream")]
    pub dead_letter_stream: String,

    #[serde(default = "default_consumer_group")]
    pub consumer_group: String,

    /// Unique per process within the group
    #[serde(default = "default_consumer_name")]
    pub consumer_name: String,

    /// Maximum messages per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// How long a read waits for new messages
    #[serde(default = "default_block_ms")]
    pub block_ms: u64,

    /// Idle time after which an unacknowledged message is redelivered.
    /// Must outlast a whole batch of lock waits, see `AppConfig::validate`.
    #[serde(default = "default_redelivery_idle_ms")]
    pub redelivery_idle_ms: u64,

    /// Deliveries after which a message is dead-lettered
    #[serde(default = "default_max_deliveries")]
    pub max_deliveries: u32,
}

impl BrokerConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let streams = [
            &self.booking_stream,
            &self.name_change_stream,
            &self.dead_letter_stream,
        ];
        for (i, stream) in streams.iter().enumerate() {
            if stream.is_empty() {
                return Err(ValidationError::MissingRequired("broker stream name"));
            }
            if streams[i + 1..].contains(stream) {
                return Err(ValidationError::DuplicateStreamName(stream.to_string()));
            }
        }
        if self.consumer_group.is_empty() || self.consumer_name.is_empty() {
            return Err(ValidationError::MissingRequired("broker consumer group/name"));
        }
        if self.batch_size == 0 {
            return Err(ValidationError::MustBePositive("broker.batch_size"));
        }
        if self.max_deliveries == 0 {
            return Err(ValidationError::MustBePositive("broker.max_deliveries"));
        }
        Ok(())
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            booking_stream: default_booking_stream(),
            name_change_stream: default_name_change_stream(),
            dead_letter_stream: default_dead_letter_stream(),
            consumer_group: default_consumer_group(),
            consumer_name: default_consumer_name(),
            batch_size: default_batch_size(),
            block_ms: default_block_ms(),
            redelivery_idle_ms: default_redelivery_idle_ms(),
            max_deliveries: default_max_deliveries(),
        }
    }
}

fn default_booking_stream() -> String {
    "course-created".to_string()
}

fn default_name_change_stream() -> String {
    "member-name-changed".to_string()
}

fn default_dead_letter_stream() -> String {
    "course-dead-letter".to_string()
}

fn default_consumer_group() -> String {
    "course-scheduler".to_string()
}

fn default_consumer_name() -> String {
    "course-scheduler-1".to_string()
}

fn default_batch_size() -> usize {
    10
}

fn default_block_ms() -> u64 {
    2_000
}

fn default_redelivery_idle_ms() -> u64 {
    120_000
}

fn default_max_deliveries() -> u32 {
    5
}
