//! Composite key of a teacher's weekly roster.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{TeacherId, YearWeek};

/// Identifies one teacher's bookings for one ISO week.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeekKey {
    pub teacher_id: TeacherId,
    pub week: YearWeek,
}

impl WeekKey {
    pub fn new(teacher_id: TeacherId, week: YearWeek) -> Self {
        Self { teacher_id, week }
    }

    /// Key under which the roster is cached in Redis.
    ///
    /// The teacher id goes last so ids containing `:` cannot collide with
    /// another teacher's week.
    pub fn to_redis_key(&self) -> String {
        format!(
            "schedule:{}:{}:{}",
            self.week.course_year,
            self.week.week_of_year,
            self.teacher_id.as_str()
        )
    }
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.teacher_id, self.week)
    }
}
