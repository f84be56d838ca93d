//! PostgreSQL adapters - Database implementations for persistence ports.
//!
//! - `PostgresScheduleStore` - Bookings with optimistic versioning
//! - `PostgresOutboxWriter` - Transactional outbox table
//! - `PostgresBookingOutcomeStore` - Accept/reject results per idempotency key

mod booking_outcomes;
mod outbox_writer;
mod schedule_store;

pub use booking_outcomes::PostgresBookingOutcomeStore;
pub use outbox_writer::PostgresOutboxWriter;
pub use schedule_store::PostgresScheduleStore;
