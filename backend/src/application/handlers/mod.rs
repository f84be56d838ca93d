//! Application handlers.
//!
//! Command, query and consumer handlers that orchestrate domain operations.

pub mod booking;
pub mod member;

pub use booking::{
    ApplyBookingCommand, ApplyBookingHandler, ApplyBookingResult, BatchReport, BookingConsumer,
    BookingConsumerPorts, BookingError, BookingStatus, ConsumerError, GetBookingStatusHandler,
    GetBookingStatusQuery, MessageOutcome,
};
pub use member::{ChangeStudentNameCommand, ChangeStudentNameHandler, NameChangeConsumer};
