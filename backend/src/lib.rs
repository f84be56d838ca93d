//! Course Scheduler - weekly class booking service.
//!
//! Booking requests are written to a transactional outbox, relayed to a
//! broker and applied by an idempotent consumer that serializes each
//! teacher's roster behind a distributed lock.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
