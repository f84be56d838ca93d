//! Outbox delivery.
//!
//! - `OutboxPublisher` - Records intents in the outbox and triggers delivery
//! - `MessageRelay` - Immediate publish plus periodic crash-recovery sweep

mod message_relay;
mod outbox_publisher;

pub use message_relay::{MessageRelay, SweepReport};
pub use outbox_publisher::OutboxPublisher;
