//! HTTP DTOs for booking endpoints.

use serde::{Deserialize, Serialize};

use crate::application::BookingStatus;
use crate::domain::foundation::{IdempotencyKey, ValidationError};
use crate::domain::schedule::{Weekday, WeeklySlots};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Requested class hour per weekday. `null` or `0` means no class.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseBookingRequest {
    #[serde(default)]
    pub monday_hour: Option<i32>,
    #[serde(default)]
    pub tuesday_hour: Option<i32>,
    #[serde(default)]
    pub wednesday_hour: Option<i32>,
    #[serde(default)]
    pub thursday_hour: Option<i32>,
    #[serde(default)]
    pub friday_hour: Option<i32>,
}

impl CourseBookingRequest {
    /// Converts to domain slots, checking each hour against `max_hour`.
    pub fn to_slots(&self, max_hour: u8) -> Result<WeeklySlots, ValidationError> {
        let raw = [
            self.monday_hour,
            self.tuesday_hour,
            self.wednesday_hour,
            self.thursday_hour,
            self.friday_hour,
        ];

        let mut hours = [None; 5];
        for ((slot, value), day) in hours.iter_mut().zip(raw).zip(Weekday::ALL) {
            *slot = match value {
                None => None,
                Some(v) if (0..=max_hour as i32).contains(&v) => Some(v as u8),
                Some(v) => {
                    return Err(ValidationError::out_of_range(
                        day.field_name(),
                        0,
                        max_hour as i32,
                        v,
                    ))
                }
            };
        }
        Ok(WeeklySlots::from_array(hours))
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Body of `202 Accepted`: the key to poll for the decision.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingAcceptedResponse {
    pub idempotency_key: String,
    pub status: &'static str,
}

impl BookingAcceptedResponse {
    pub fn pending(key: &IdempotencyKey) -> Self {
        Self {
            idempotency_key: key.to_string(),
            status: "PENDING",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingStatusResponse {
    pub idempotency_key: String,
    #[serde(flatten)]
    pub status: BookingStatus,
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Response DTO
// ════════════════════════════════════════════════════════════════════════════════

/// Standard error response for API errors.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_parses_camel_case_with_missing_days() {
        let request: CourseBookingRequest =
            serde_json::from_str(r#"{"mondayHour": 3, "fridayHour": null}"#).unwrap();
        let slots = request.to_slots(12).unwrap();

        assert_eq!(slots.booked_hour(Weekday::Monday), Some(3));
        assert_eq!(slots.raw(Weekday::Tuesday), None);
    }

    #[test]
    fn zero_is_kept_as_no_class() {
        let request = CourseBookingRequest {
            wednesday_hour: Some(0),
            ..Default::default()
        };
        let slots = request.to_slots(12).unwrap();
        assert_eq!(slots.raw(Weekday::Wednesday), Some(0));
        assert!(slots.is_empty());
    }

    #[test]
    fn negative_and_too_large_hours_are_rejected() {
        let negative = CourseBookingRequest {
            monday_hour: Some(-1),
            ..Default::default()
        };
        let err = negative.to_slots(12).unwrap_err();
        assert_eq!(err.field(), "monday_hour");

        let large = CourseBookingRequest {
            thursday_hour: Some(300),
            ..Default::default()
        };
        assert_eq!(large.to_slots(12).unwrap_err().field(), "thursday_hour");
    }

    #[test]
    fn status_response_flattens_status() {
        let response = BookingStatusResponse {
            idempotency_key: "k-1".to_string(),
            status: BookingStatus::Pending,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["idempotencyKey"], "k-1");
        assert_eq!(json["status"], "PENDING");
    }
}
