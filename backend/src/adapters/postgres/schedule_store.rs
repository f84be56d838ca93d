//! PostgreSQL implementation of ScheduleStore.
//!
//! Bookings live in `course_schedules`, one row per student per ISO week.
//! Writes are guarded by the `(student_id, course_year, week_of_year)`
//! unique constraint on insert and by the `version` column on update.

use crate::domain::foundation::{
    BookingId, DomainError, ErrorCode, StudentId, TeacherId, Timestamp, YearWeek,
};
use crate::domain::schedule::{Booking, WeeklySlots};
use crate::ports::ScheduleStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

const SELECT_COLUMNS: &str = r#"
    SELECT id, student_id, student_name, teacher_id, teacher_name,
           monday_hour, tuesday_hour, wednesday_hour, thursday_hour, friday_hour,
           course_year, week_of_year, version, created_at, updated_at
    FROM course_schedules
"#;

/// PostgreSQL implementation of the ScheduleStore port.
pub struct PostgresScheduleStore {
    pool: PgPool,
}

impl PostgresScheduleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert(&self, booking: &Booking) -> Result<Booking, DomainError> {
        let [mon, tue, wed, thu, fri] = hours_to_columns(&booking.slots);

        let result = sqlx::query(
            r#"
            INSERT INTO course_schedules (
                id, student_id, student_name, teacher_id, teacher_name,
                monday_hour, tuesday_hour, wednesday_hour, thursday_hour, friday_hour,
                course_year, week_of_year, version, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 1, $13, $14)
            ON CONFLICT (student_id, course_year, week_of_year) DO NOTHING
            "#,
        )
        .bind(booking.id.as_uuid())
        .bind(booking.student_id.as_str())
        .bind(&booking.student_name)
        .bind(booking.teacher_id.as_str())
        .bind(&booking.teacher_name)
        .bind(mon)
        .bind(tue)
        .bind(wed)
        .bind(thu)
        .bind(fri)
        .bind(booking.week.course_year)
        .bind(booking.week.week_of_year as i32)
        .bind(booking.created_at.as_datetime())
        .bind(booking.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to insert booking", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::ConcurrentModification,
                format!(
                    "Student {} already has a booking for {}",
                    booking.student_id, booking.week
                ),
            ));
        }

        let mut stored = booking.clone();
        stored.version = 1;
        Ok(stored)
    }

    async fn update(&self, booking: &Booking) -> Result<Booking, DomainError> {
        let [mon, tue, wed, thu, fri] = hours_to_columns(&booking.slots);

        let new_version: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE course_schedules SET
                student_name = $3,
                teacher_id = $4,
                teacher_name = $5,
                monday_hour = $6,
                tuesday_hour = $7,
                wednesday_hour = $8,
                thursday_hour = $9,
                friday_hour = $10,
                updated_at = $11,
                version = version + 1
            WHERE id = $1 AND version = $2
            RETURNING version
            "#,
        )
        .bind(booking.id.as_uuid())
        .bind(booking.version)
        .bind(&booking.student_name)
        .bind(booking.teacher_id.as_str())
        .bind(&booking.teacher_name)
        .bind(mon)
        .bind(tue)
        .bind(wed)
        .bind(thu)
        .bind(fri)
        .bind(booking.updated_at.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to update booking", e))?;

        match new_version {
            Some(version) => {
                let mut stored = booking.clone();
                stored.version = version;
                Ok(stored)
            }
            None => Err(DomainError::new(
                ErrorCode::ConcurrentModification,
                format!(
                    "Booking {} was modified concurrently (expected version {})",
                    booking.id, booking.version
                ),
            )),
        }
    }
}

/// Database row representation of a booking.
#[derive(Debug, sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    student_id: String,
    student_name: String,
    teacher_id: String,
    teacher_name: String,
    monday_hour: Option<i16>,
    tuesday_hour: Option<i16>,
    wednesday_hour: Option<i16>,
    thursday_hour: Option<i16>,
    friday_hour: Option<i16>,
    course_year: i32,
    week_of_year: i32,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = DomainError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let invalid = |e: crate::domain::foundation::ValidationError| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid booking row: {}", e))
        };

        let week_of_year = u32::try_from(row.week_of_year).map_err(|_| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid week_of_year value: {}", row.week_of_year),
            )
        })?;

        Ok(Booking {
            id: BookingId::from_uuid(row.id),
            student_id: StudentId::new(row.student_id).map_err(invalid)?,
            student_name: row.student_name,
            teacher_id: TeacherId::new(row.teacher_id).map_err(invalid)?,
            teacher_name: row.teacher_name,
            slots: WeeklySlots::from_array([
                parse_hour(row.monday_hour)?,
                parse_hour(row.tuesday_hour)?,
                parse_hour(row.wednesday_hour)?,
                parse_hour(row.thursday_hour)?,
                parse_hour(row.friday_hour)?,
            ]),
            week: YearWeek::new(row.course_year, week_of_year).map_err(invalid)?,
            version: row.version,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn parse_hour(value: Option<i16>) -> Result<Option<u8>, DomainError> {
    value
        .map(|h| {
            u8::try_from(h).map_err(|_| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid hour value: {}", h))
            })
        })
        .transpose()
}

fn hours_to_columns(slots: &WeeklySlots) -> [Option<i16>; 5] {
    [
        slots.monday_hour,
        slots.tuesday_hour,
        slots.wednesday_hour,
        slots.thursday_hour,
        slots.friday_hour,
    ]
    .map(|h| h.map(i16::from))
}

#[async_trait]
impl ScheduleStore for PostgresScheduleStore {
    async fn find_by_teacher_and_week(
        &self,
        teacher_id: &TeacherId,
        week: YearWeek,
    ) -> Result<Vec<Booking>, DomainError> {
        let sql = format!(
            "{} WHERE teacher_id = $1 AND course_year = $2 AND week_of_year = $3 ORDER BY created_at",
            SELECT_COLUMNS
        );

        let rows: Vec<BookingRow> = sqlx::query_as(&sql)
            .bind(teacher_id.as_str())
            .bind(week.course_year)
            .bind(week.week_of_year as i32)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to load teacher week", e))?;

        rows.into_iter().map(Booking::try_from).collect()
    }

    async fn find_by_student_and_week(
        &self,
        student_id: &StudentId,
        week: YearWeek,
    ) -> Result<Option<Booking>, DomainError> {
        let sql = format!(
            "{} WHERE student_id = $1 AND course_year = $2 AND week_of_year = $3",
            SELECT_COLUMNS
        );

        let row: Option<BookingRow> = sqlx::query_as(&sql)
            .bind(student_id.as_str())
            .bind(week.course_year)
            .bind(week.week_of_year as i32)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to find student booking", e))?;

        row.map(Booking::try_from).transpose()
    }

    async fn upsert(&self, booking: &Booking) -> Result<Booking, DomainError> {
        if booking.is_persisted() {
            self.update(booking).await
        } else {
            self.insert(booking).await
        }
    }

    async fn rename_student(
        &self,
        student_id: &StudentId,
        new_name: &str,
        at: Timestamp,
    ) -> Result<Vec<Booking>, DomainError> {
        let rows: Vec<BookingRow> = sqlx::query_as(
            r#"
            UPDATE course_schedules SET
                student_name = $2,
                updated_at = $3,
                version = version + 1
            WHERE student_id = $1 AND student_name <> $2
            RETURNING id, student_id, student_name, teacher_id, teacher_name,
                      monday_hour, tuesday_hour, wednesday_hour, thursday_hour, friday_hour,
                      course_year, week_of_year, version, created_at, updated_at
            "#,
        )
        .bind(student_id.as_str())
        .bind(new_name)
        .bind(at.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to rename student", e))?;

        rows.into_iter().map(Booking::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hours_map_to_smallint_columns() {
        let slots = WeeklySlots::from_array([Some(3), None, Some(0), None, Some(8)]);
        assert_eq!(hours_to_columns(&slots), [Some(3), None, Some(0), None, Some(8)]);
    }

    #[test]
    fn negative_hour_in_row_is_rejected() {
        assert!(parse_hour(Some(-1)).is_err());
        assert_eq!(parse_hour(Some(4)).unwrap(), Some(4));
        assert_eq!(parse_hour(None).unwrap(), None);
    }

    #[test]
    fn row_converts_to_booking() {
        let now = Utc::now();
        let row = BookingRow {
            id: Uuid::new_v4(),
            student_id: "stu-1".to_string(),
            student_name: "Ada".to_string(),
            teacher_id: "tch-1".to_string(),
            teacher_name: "Grace".to_string(),
            monday_hour: Some(2),
            tuesday_hour: None,
            wednesday_hour: None,
            thursday_hour: None,
            friday_hour: Some(0),
            course_year: 2024,
            week_of_year: 12,
            version: 3,
            created_at: now,
            updated_at: now,
        };

        let booking = Booking::try_from(row).unwrap();
        assert_eq!(booking.week, YearWeek::new(2024, 12).unwrap());
        assert_eq!(booking.version, 3);
        assert!(booking.is_persisted());
        assert_eq!(booking.slots.monday_hour, Some(2));
    }

    #[test]
    fn row_with_invalid_week_is_rejected() {
        let now = Utc::now();
        let row = BookingRow {
            id: Uuid::new_v4(),
            student_id: "stu-1".to_string(),
            student_name: "Ada".to_string(),
            teacher_id: "tch-1".to_string(),
            teacher_name: "Grace".to_string(),
            monday_hour: None,
            tuesday_hour: None,
            wednesday_hour: None,
            thursday_hour: None,
            friday_hour: None,
            course_year: 2024,
            week_of_year: 60,
            version: 1,
            created_at: now,
            updated_at: now,
        };

        assert!(Booking::try_from(row).is_err());
    }
}
