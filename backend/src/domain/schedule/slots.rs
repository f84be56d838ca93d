//! Weekday slot hours requested or held by a booking.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::ValidationError;

/// School day a class can be booked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl Weekday {
    /// All bookable days, Monday first.
    pub const ALL: [Weekday; 5] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
    ];

    /// Name of the slot field holding this day's hour.
    pub fn field_name(&self) -> &'static str {
        match self {
            Weekday::Monday => "monday_hour",
            Weekday::Tuesday => "tuesday_hour",
            Weekday::Wednesday => "wednesday_hour",
            Weekday::Thursday => "thursday_hour",
            Weekday::Friday => "friday_hour",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Weekday::Monday => "MONDAY",
            Weekday::Tuesday => "TUESDAY",
            Weekday::Wednesday => "WEDNESDAY",
            Weekday::Thursday => "THURSDAY",
            Weekday::Friday => "FRIDAY",
        };
        f.write_str(s)
    }
}

/// Class hour for each weekday.
///
/// `None` and `Some(0)` both mean "no class that day". Any other value is a
/// booked hour and takes part in conflict detection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklySlots {
    #[serde(default)]
    pub monday_hour: Option<u8>,
    #[serde(default)]
    pub tuesday_hour: Option<u8>,
    #[serde(default)]
    pub wednesday_hour: Option<u8>,
    #[serde(default)]
    pub thursday_hour: Option<u8>,
    #[serde(default)]
    pub friday_hour: Option<u8>,
}

impl WeeklySlots {
    /// Builds slots from one raw value per weekday, Monday first.
    pub fn from_array(hours: [Option<u8>; 5]) -> Self {
        let [monday_hour, tuesday_hour, wednesday_hour, thursday_hour, friday_hour] = hours;
        Self {
            monday_hour,
            tuesday_hour,
            wednesday_hour,
            thursday_hour,
            friday_hour,
        }
    }

    /// Raw stored value for a day, including `Some(0)`.
    pub fn raw(&self, day: Weekday) -> Option<u8> {
        match day {
            Weekday::Monday => self.monday_hour,
            Weekday::Tuesday => self.tuesday_hour,
            Weekday::Wednesday => self.wednesday_hour,
            Weekday::Thursday => self.thursday_hour,
            Weekday::Friday => self.friday_hour,
        }
    }

    /// Booked hour for a day, or `None` when the day is free.
    pub fn booked_hour(&self, day: Weekday) -> Option<u8> {
        self.raw(day).filter(|hour| *hour != 0)
    }

    /// Days that carry a booked hour.
    pub fn booked_days(&self) -> impl Iterator<Item = (Weekday, u8)> + '_ {
        Weekday::ALL
            .into_iter()
            .filter_map(move |day| self.booked_hour(day).map(|hour| (day, hour)))
    }

    pub fn is_empty(&self) -> bool {
        self.booked_days().next().is_none()
    }

    /// Checks every booked hour lies in `1..=max_hour`.
    pub fn validate(&self, max_hour: u8) -> Result<(), ValidationError> {
        for (day, hour) in self.booked_days() {
            if hour > max_hour {
                return Err(ValidationError::out_of_range(
                    day.field_name(),
                    0,
                    max_hour as i32,
                    hour as i32,
                ));
            }
        }
        Ok(())
    }
}
