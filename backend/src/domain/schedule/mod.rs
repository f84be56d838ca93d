//! Schedule domain - weekly bookings between students and teachers.
//!
//! - `WeeklySlots` - the five weekday class hours
//! - `BookingIntent` - what a student asked for
//! - `Booking` - what the schedule holds
//! - `ConflictValidator` - pure collision check under the teacher lock

mod booking;
mod conflict;
mod intent;
mod slots;
mod week_key;

pub use booking::Booking;
pub use conflict::{ConflictValidator, ScheduleConflict, Verdict};
pub use intent::{BookingIntent, MemberIdentity};
pub use slots::{Weekday, WeeklySlots};
pub use week_key::WeekKey;
