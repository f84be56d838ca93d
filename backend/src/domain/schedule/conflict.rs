//! Conflict Validator - decides whether a booking intent collides with a
//! teacher's existing weekly roster.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Booking, BookingIntent, Weekday};
use crate::domain::foundation::{StudentId, TeacherId};

/// A slot already held by another student of the same teacher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleConflict {
    pub day: Weekday,
    pub hour: u8,
    pub teacher_id: TeacherId,
    pub teacher_name: String,
    pub existing_student_id: StudentId,
    pub existing_student_name: String,
}

impl fmt::Display for ScheduleConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} hour {} with teacher {} is already booked by student {} ({})",
            self.day,
            self.hour,
            self.teacher_name,
            self.existing_student_name,
            self.existing_student_id
        )
    }
}

/// Outcome of validating an intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Conflict(ScheduleConflict),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}

/// Pure slot-collision check.
pub struct ConflictValidator;

impl ConflictValidator {
    /// Validates a candidate against existing bookings.
    ///
    /// # Algorithm
    /// For each existing booking of the same teacher and a different
    /// student, compare the five weekday hours pairwise. The first day on
    /// which both sides hold the same booked hour is the conflict.
    ///
    /// # Edge Cases
    /// - Empty roster: Accepted
    /// - `None` or `0` on either side: never collides
    /// - Same student: skipped, a resubmission is an update
    /// - Other teachers in `existing`: ignored
    pub fn validate(candidate: &BookingIntent, existing: &[Booking]) -> Verdict {
        for booking in existing {
            if booking.teacher_id != candidate.teacher_id
                || booking.student_id == candidate.student_id
            {
                continue;
            }

            for (day, hour) in candidate.slots.booked_days() {
                if booking.slots.booked_hour(day) == Some(hour) {
                    return Verdict::Conflict(ScheduleConflict {
                        day,
                        hour,
                        teacher_id: booking.teacher_id.clone(),
                        teacher_name: booking.teacher_name.clone(),
                        existing_student_id: booking.student_id.clone(),
                        existing_student_name: booking.student_name.clone(),
                    });
                }
            }
        }

        Verdict::Accepted
    }
}
