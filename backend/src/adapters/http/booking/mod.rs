//! HTTP adapter for booking endpoints.
//!
//! - `POST /api/courses` - Request weekly slots; answered with `202 Accepted`
//! - `GET /api/courses/requests/:key` - Pending, accepted or rejected

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{BookingApiError, BookingAppState};
pub use routes::{booking_router, booking_routes};
