//! Booking aggregate - one student's weekly slots with one teacher.

use serde::{Deserialize, Serialize};

use super::{BookingIntent, WeekKey, WeeklySlots};
use crate::domain::foundation::{BookingId, StudentId, TeacherId, Timestamp, YearWeek};

/// Persisted schedule row.
///
/// At most one booking exists per (student, course year, week). `version`
/// is 0 until the row is first stored and increments on every update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: BookingId,
    pub student_id: StudentId,
    pub student_name: String,
    pub teacher_id: TeacherId,
    pub teacher_name: String,
    #[serde(flatten)]
    pub slots: WeeklySlots,
    pub week: YearWeek,
    pub version: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Booking {
    /// Creates an unsaved booking from an accepted intent.
    pub fn from_intent(intent: &BookingIntent, week: YearWeek, now: Timestamp) -> Self {
        Self {
            id: BookingId::new(),
            student_id: intent.student_id.clone(),
            student_name: intent.student_name.clone(),
            teacher_id: intent.teacher_id.clone(),
            teacher_name: intent.teacher_name.clone(),
            slots: intent.slots,
            week,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrites names, teacher and slot hours with a newer intent from
    /// the same student for the same week.
    pub fn apply_intent(&mut self, intent: &BookingIntent, now: Timestamp) {
        self.student_name = intent.student_name.clone();
        self.teacher_id = intent.teacher_id.clone();
        self.teacher_name = intent.teacher_name.clone();
        self.slots = intent.slots;
        self.updated_at = now;
    }

    /// Returns false when the name is already current.
    pub fn rename_student(&mut self, new_name: &str, now: Timestamp) -> bool {
        if self.student_name == new_name {
            return false;
        }
        self.student_name = new_name.to_string();
        self.updated_at = now;
        true
    }

    pub fn is_persisted(&self) -> bool {
        self.version > 0
    }

    pub fn week_key(&self) -> WeekKey {
        WeekKey::new(self.teacher_id.clone(), self.week)
    }
}
