//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, the clock, and error types
//! that form the vocabulary of the course scheduling domain.

mod clock;
mod errors;
mod events;
mod ids;
mod timestamp;

pub use clock::{current_year_week, Clock, FixedClock, SystemClock, YearWeek};
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use events::{EventType, IdempotencyKey, EVENT_TYPE_HEADER, IDEMPOTENCY_KEY_HEADER};
pub use ids::{BookingId, OutboxId, StudentId, TeacherId};
pub use timestamp::Timestamp;
