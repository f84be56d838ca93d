//! Injected clock and the ISO week a booking belongs to.
//!
//! Bookings are weekly: every schedule row is scoped to an ISO-8601
//! week-numbering year and week. The current week is always derived from a
//! [`Clock`] passed in by the caller, never from process-wide state, so tests
//! can pin time with [`FixedClock`].

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Timestamp, ValidationError};

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> Timestamp;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Clock frozen at a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(DateTime<Utc>);

impl FixedClock {
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self(instant)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_datetime(self.0)
    }
}

/// ISO week-numbering year plus week of that year (1-53).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearWeek {
    pub course_year: i32,
    pub week_of_year: u32,
}

impl YearWeek {
    /// Creates a YearWeek, rejecting weeks outside 1..=53.
    pub fn new(course_year: i32, week_of_year: u32) -> Result<Self, ValidationError> {
        if !(1..=53).contains(&week_of_year) {
            return Err(ValidationError::out_of_range(
                "week_of_year",
                1,
                53,
                week_of_year as i32,
            ));
        }
        Ok(Self {
            course_year,
            week_of_year,
        })
    }

    /// The ISO week containing the given instant.
    pub fn containing(instant: &Timestamp) -> Self {
        let iso = instant.as_datetime().iso_week();
        Self {
            course_year: iso.year(),
            week_of_year: iso.week(),
        }
    }
}

impl fmt::Display for YearWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.course_year, self.week_of_year)
    }
}

/// The week bookings made "now" belong to.
pub fn current_year_week(clock: &dyn Clock) -> YearWeek {
    YearWeek::containing(&clock.now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn clock(y: i32, m: u32, d: u32) -> FixedClock {
        FixedClock::at(Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap())
    }

    #[test]
    fn mid_year_week_is_computed() {
        let week = current_year_week(&clock(2024, 3, 13));
        assert_eq!(week, YearWeek::new(2024, 11).unwrap());
    }

    #[test]
    fn early_january_can_belong_to_previous_iso_year() {
        // 2021-01-01 is a Friday in ISO week 53 of 2020.
        let week = current_year_week(&clock(2021, 1, 1));
        assert_eq!(week.course_year, 2020);
        assert_eq!(week.week_of_year, 53);
    }

    #[test]
    fn same_week_from_monday_to_sunday() {
        let monday = current_year_week(&clock(2024, 3, 11));
        let sunday = current_year_week(&clock(2024, 3, 17));
        assert_eq!(monday, sunday);
    }

    #[test]
    fn year_week_rejects_week_zero_and_54() {
        assert!(YearWeek::new(2024, 0).is_err());
        assert!(YearWeek::new(2024, 54).is_err());
        assert!(YearWeek::new(2020, 53).is_ok());
    }

    #[test]
    fn year_week_displays_iso_style() {
        assert_eq!(YearWeek::new(2024, 3).unwrap().to_string(), "2024-W03");
    }
}
