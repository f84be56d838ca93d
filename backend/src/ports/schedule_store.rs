//! ScheduleStore port - authoritative storage of bookings.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, StudentId, TeacherId, Timestamp, YearWeek};
use crate::domain::schedule::Booking;

/// Port for persisting bookings.
///
/// Implementations must keep at most one booking per
/// (student, course year, week) and check `version` on update.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Every booking of a teacher in a week.
    async fn find_by_teacher_and_week(
        &self,
        teacher_id: &TeacherId,
        week: YearWeek,
    ) -> Result<Vec<Booking>, DomainError>;

    /// The booking a student holds in a week, if any.
    async fn find_by_student_and_week(
        &self,
        student_id: &StudentId,
        week: YearWeek,
    ) -> Result<Option<Booking>, DomainError>;

    /// Inserts an unsaved booking or updates a saved one.
    ///
    /// # Errors
    ///
    /// - `ConcurrentModification` if a row for the same student/week already
    ///   exists on insert, or the stored version differs from
    ///   `booking.version` on update
    /// - `DatabaseError` on storage failure
    ///
    /// Returns the stored booking with its new version.
    async fn upsert(&self, booking: &Booking) -> Result<Booking, DomainError>;

    /// Overwrites the student name on every booking of the student,
    /// stamping `at` as the update time.
    ///
    /// Returns the bookings that actually changed.
    async fn rename_student(
        &self,
        student_id: &StudentId,
        new_name: &str,
        at: Timestamp,
    ) -> Result<Vec<Booking>, DomainError>;
}
