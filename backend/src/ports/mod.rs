//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Booking Pipeline Ports
//!
//! - `OutboxWriter` - Transactional intent persistence for guaranteed delivery
//! - `MessagePublisher` / `MessageSource` - At-least-once broker
//! - `IdempotencyGuard` - Claim-once gate for redeliveries
//! - `DistributedLock` - Per-teacher lease lock
//! - `ScheduleStore` / `ScheduleCache` - Bookings and their weekly projection
//! - `BookingOutcomeStore` - Asynchronous accept/reject results
//!
//! ## External Service Ports
//!
//! - `IdentityLookup` - Member service
//! - `CircuitBreaker` - Fail-fast wrapper for the member service

mod booking_outcome_store;
mod circuit_breaker;
mod distributed_lock;
mod idempotency_guard;
mod identity_lookup;
mod message_broker;
mod outbox_writer;
mod schedule_cache;
mod schedule_store;

pub use booking_outcome_store::{BookingOutcome, BookingOutcomeStore};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerMetrics, CircuitState};
pub use distributed_lock::{teacher_lock_key, DistributedLock, LockHandle};
pub use idempotency_guard::IdempotencyGuard;
pub use identity_lookup::{IdentityError, IdentityLookup};
pub use message_broker::{BrokerMessage, DeliveredMessage, DeliveryId, MessagePublisher, MessageSource};
pub use outbox_writer::{OutboxRecord, OutboxWriter};
pub use schedule_cache::ScheduleCache;
pub use schedule_store::ScheduleStore;
