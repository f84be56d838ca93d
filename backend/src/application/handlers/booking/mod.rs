//! Booking command, query and consumer handlers.

mod apply_booking;
mod booking_consumer;
mod get_booking_status;

pub use apply_booking::{ApplyBookingCommand, ApplyBookingHandler, ApplyBookingResult, BookingError};
pub use booking_consumer::{
    BatchReport, BookingConsumer, BookingConsumerPorts, ConsumerError, MessageOutcome,
};
pub use get_booking_status::{BookingStatus, GetBookingStatusHandler, GetBookingStatusQuery};
