//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `events` - Outbox publishing and the relay to the broker
//! - `http` - Inbound REST endpoints
//! - `identity` - Member service client
//! - `in_memory` - Test and single-process implementations of every port
//! - `postgres` - Schedule, outbox and outcome tables
//! - `redis` - Idempotency keys, locks, roster cache and streams broker
//! - `resilience` - Circuit breaker

pub mod events;
pub mod http;
pub mod identity;
pub mod in_memory;
pub mod postgres;
pub mod redis;
pub mod resilience;

pub use events::{MessageRelay, OutboxPublisher, SweepReport};
