//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, clock, errors, event vocabulary)
//! - `schedule` - Weekly bookings and the conflict validator

pub mod foundation;
pub mod schedule;
