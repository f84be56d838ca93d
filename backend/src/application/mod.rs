//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Following CQRS, it separates command handlers (write) from query handlers (read).

pub mod handlers;
mod weekly_schedule_cache;

pub use handlers::{
    // Booking request path
    ApplyBookingCommand, ApplyBookingHandler, ApplyBookingResult, BookingError,
    // Status query
    BookingStatus, GetBookingStatusHandler, GetBookingStatusQuery,
    // Consumers
    BatchReport, BookingConsumer, BookingConsumerPorts, ConsumerError, MessageOutcome,
    ChangeStudentNameCommand, ChangeStudentNameHandler, NameChangeConsumer,
};
pub use weekly_schedule_cache::WeeklyScheduleCache;
