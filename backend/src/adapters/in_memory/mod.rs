//! In-memory adapters for tests and single-process development.
//!
//! Each mirrors the guarantees of its production counterpart closely
//! enough to run the whole booking pipeline without PostgreSQL or Redis.

mod booking_outcomes;
mod broker;
mod distributed_lock;
mod idempotency_guard;
mod outbox;
mod schedule_cache;
mod schedule_store;

pub use booking_outcomes::InMemoryBookingOutcomeStore;
pub use broker::InMemoryBroker;
pub use distributed_lock::InMemoryDistributedLock;
pub use idempotency_guard::InMemoryIdempotencyGuard;
pub use outbox::InMemoryOutbox;
pub use schedule_cache::InMemoryScheduleCache;
pub use schedule_store::InMemoryScheduleStore;
