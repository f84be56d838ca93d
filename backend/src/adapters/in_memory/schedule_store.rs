//! In-memory ScheduleStore for tests and local runs.
//!
//! Enforces the same rules as the PostgreSQL store: one booking per
//! student/week and version-checked updates.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use crate::domain::foundation::{
    BookingId, DomainError, ErrorCode, StudentId, TeacherId, Timestamp, YearWeek,
};
use crate::domain::schedule::Booking;
use crate::ports::ScheduleStore;

#[derive(Default)]
pub struct InMemoryScheduleStore {
    rows: Mutex<HashMap<BookingId, Booking>>,
    unavailable: AtomicBool,
}

impl InMemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail with `DatabaseError` until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Snapshot of every stored booking.
    pub async fn all(&self) -> Vec<Booking> {
        self.rows.lock().await.values().cloned().collect()
    }

    fn check_available(&self) -> Result<(), DomainError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::database("Schedule store", "unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl ScheduleStore for InMemoryScheduleStore {
    async fn find_by_teacher_and_week(
        &self,
        teacher_id: &TeacherId,
        week: YearWeek,
    ) -> Result<Vec<Booking>, DomainError> {
        self.check_available()?;
        let rows = self.rows.lock().await;
        let mut found: Vec<Booking> = rows
            .values()
            .filter(|b| &b.teacher_id == teacher_id && b.week == week)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(found)
    }

    async fn find_by_student_and_week(
        &self,
        student_id: &StudentId,
        week: YearWeek,
    ) -> Result<Option<Booking>, DomainError> {
        self.check_available()?;
        let rows = self.rows.lock().await;
        Ok(rows
            .values()
            .find(|b| &b.student_id == student_id && b.week == week)
            .cloned())
    }

    async fn upsert(&self, booking: &Booking) -> Result<Booking, DomainError> {
        self.check_available()?;
        let mut rows = self.rows.lock().await;

        if !booking.is_persisted() {
            let taken = rows
                .values()
                .any(|b| b.student_id == booking.student_id && b.week == booking.week);
            if taken {
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
            rows.insert(stored.id, stored.clone());
            return Ok(stored);
        }

        match rows.get_mut(&booking.id) {
            Some(current) if current.version == booking.version => {
                let mut stored = booking.clone();
                stored.version = current.version + 1;
                *current = stored.clone();
                Ok(stored)
            }
            _ => Err(DomainError::new(
                ErrorCode::ConcurrentModification,
                format!(
                    "Booking {} was modified concurrently (expected version {})",
                    booking.id, booking.version
                ),
            )),
        }
    }

    async fn rename_student(
        &self,
        student_id: &StudentId,
        new_name: &str,
        at: Timestamp,
    ) -> Result<Vec<Booking>, DomainError> {
        self.check_available()?;
        let mut rows = self.rows.lock().await;

        let mut renamed = Vec::new();
        for booking in rows.values_mut().filter(|b| &b.student_id == student_id) {
            if booking.rename_student(new_name, at) {
                booking.version += 1;
                renamed.push(booking.clone());
            }
        }
        Ok(renamed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schedule::{BookingIntent, WeeklySlots};

    fn booking(student: &str) -> Booking {
        let intent = BookingIntent {
            teacher_id: TeacherId::new("t1").unwrap(),
            teacher_name: "Grace".to_string(),
            student_id: StudentId::new(student).unwrap(),
            student_name: "Ada".to_string(),
            slots: WeeklySlots::from_array([Some(1), None, None, None, None]),
        };
        Booking::from_intent(&intent, YearWeek::new(2024, 5).unwrap(), Timestamp::now())
    }

    #[tokio::test]
    async fn insert_then_update_bumps_version() {
        let store = InMemoryScheduleStore::new();
        let stored = store.upsert(&booking("s1")).await.unwrap();
        assert_eq!(stored.version, 1);

        let updated = store.upsert(&stored).await.unwrap();
        assert_eq!(updated.version, 2);
    }

    #[tokio::test]
    async fn second_insert_for_same_student_week_is_rejected() {
        let store = InMemoryScheduleStore::new();
        store.upsert(&booking("s1")).await.unwrap();

        let err = store.upsert(&booking("s1")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ConcurrentModification);
    }

    #[tokio::test]
    async fn stale_version_is_rejected() {
        let store = InMemoryScheduleStore::new();
        let v1 = store.upsert(&booking("s1")).await.unwrap();
        store.upsert(&v1).await.unwrap();

        let err = store.upsert(&v1).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ConcurrentModification);
    }

    #[tokio::test]
    async fn rename_skips_rows_already_named() {
        let store = InMemoryScheduleStore::new();
        store.upsert(&booking("s1")).await.unwrap();
        let student = StudentId::new("s1").unwrap();

        let at = Timestamp::now().plus_days(1);

        assert!(store.rename_student(&student, "Ada", at).await.unwrap().is_empty());
        let renamed = store.rename_student(&student, "Ada L.", at).await.unwrap();
        assert_eq!(renamed.len(), 1);
        assert_eq!(renamed[0].version, 2);
        assert_eq!(renamed[0].updated_at, at);
    }
}
