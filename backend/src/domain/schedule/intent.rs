//! Booking intent carried through the outbox and the broker.

use serde::{Deserialize, Serialize};

use super::WeeklySlots;
use crate::domain::foundation::{StudentId, TeacherId};

/// Student and teacher pairing as reported by the member service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberIdentity {
    pub student_id: StudentId,
    pub student_name: String,
    pub teacher_id: TeacherId,
    pub teacher_name: String,
}

/// A student's request to hold weekly slots with a teacher.
///
/// Immutable once written to the outbox. The wire form is a flat JSON
/// object: identity fields next to `mondayHour` .. `fridayHour`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingIntent {
    pub teacher_id: TeacherId,
    pub teacher_name: String,
    pub student_id: StudentId,
    pub student_name: String,
    #[serde(flatten)]
    pub slots: WeeklySlots,
}

impl BookingIntent {
    pub fn new(identity: MemberIdentity, slots: WeeklySlots) -> Self {
        Self {
            teacher_id: identity.teacher_id,
            teacher_name: identity.teacher_name,
            student_id: identity.student_id,
            student_name: identity.student_name,
            slots,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schedule::Weekday;

    fn identity() -> MemberIdentity {
        MemberIdentity {
            student_id: StudentId::new("stu-1").unwrap(),
            student_name: "Ada".to_string(),
            teacher_id: TeacherId::new("tch-1").unwrap(),
            teacher_name: "Grace".to_string(),
        }
    }

    #[test]
    fn wire_format_is_flat_camel_case() {
        let intent = BookingIntent::new(
            identity(),
            WeeklySlots::from_array([Some(3), None, None, None, Some(0)]),
        );
        let json = serde_json::to_value(&intent).unwrap();

        assert_eq!(json["teacherId"], "tch-1");
        assert_eq!(json["studentName"], "Ada");
        assert_eq!(json["mondayHour"], 3);
        assert_eq!(json["fridayHour"], 0);
    }

    #[test]
    fn parses_payload_with_null_hours() {
        let payload = r#"{
            "teacherId": "tch-1", "teacherName": "Grace",
            "studentId": "stu-9", "studentName": "Linus",
            "mondayHour": null, "tuesdayHour": 5, "wednesdayHour": null,
            "thursdayHour": 0, "fridayHour": null
        }"#;
        let intent: BookingIntent = serde_json::from_str(payload).unwrap();

        assert_eq!(intent.student_id.as_str(), "stu-9");
        assert_eq!(intent.slots.booked_hour(Weekday::Tuesday), Some(5));
        assert_eq!(intent.slots.booked_days().count(), 1);
    }

    #[test]
    fn rejects_payload_with_blank_teacher() {
        let payload = r#"{"teacherId":"","teacherName":"x","studentId":"s","studentName":"y"}"#;
        assert!(serde_json::from_str::<BookingIntent>(payload).is_err());
    }
}
