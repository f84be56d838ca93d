//! WeeklyScheduleCache - read-through roster of a teacher's week.
//!
//! The store is the source of truth. Writers invalidate the entry after
//! every change to a roster and the next read reloads it; entries are
//! never patched in place.

use std::sync::Arc;

use crate::domain::foundation::DomainError;
use crate::domain::schedule::{Booking, WeekKey};
use crate::ports::{ScheduleCache, ScheduleStore};

pub struct WeeklyScheduleCache {
    store: Arc<dyn ScheduleStore>,
    cache: Arc<dyn ScheduleCache>,
}

impl WeeklyScheduleCache {
    pub fn new(store: Arc<dyn ScheduleStore>, cache: Arc<dyn ScheduleCache>) -> Self {
        Self { store, cache }
    }

    /// Every booking of the teacher in the week, cache first.
    ///
    /// A cache that cannot be read is bypassed; only store failures are
    /// returned.
    pub async fn load(&self, key: &WeekKey) -> Result<Vec<Booking>, DomainError> {
        match self.cache.get(key).await {
            Ok(Some(bookings)) => {
                tracing::trace!(week_key = %key, "Roster cache hit");
                return Ok(bookings);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(week_key = %key, error = %e, "Roster cache read failed, using store");
            }
        }

        let bookings = self
            .store
            .find_by_teacher_and_week(&key.teacher_id, key.week)
            .await?;

        if let Err(e) = self.cache.put(key, &bookings).await {
            tracing::warn!(week_key = %key, error = %e, "Roster cache fill failed");
        }
        Ok(bookings)
    }

    /// Re-reads the roster from the store and repairs the cache when the
    /// `cached` rows no longer match it.
    ///
    /// Writes that bypass the booking path, or an invalidation lost after a
    /// write, leave a stale entry behind. Decisions taken under the teacher
    /// lock go through here so they never rest on such an entry.
    pub async fn confirm(&self, key: &WeekKey, cached: &[Booking]) -> Result<Vec<Booking>, DomainError> {
        let bookings = self
            .store
            .find_by_teacher_and_week(&key.teacher_id, key.week)
            .await?;

        if !same_rows(cached, &bookings) {
            tracing::warn!(
                week_key = %key,
                cached = cached.len(),
                stored = bookings.len(),
                "Cached roster was stale, refreshing"
            );
            if let Err(e) = self.cache.put(key, &bookings).await {
                tracing::warn!(week_key = %key, error = %e, "Roster cache refresh failed");
            }
        }
        Ok(bookings)
    }

    /// Drops the entry so the next `load` sees the store.
    ///
    /// Failure is returned: a stale roster left behind could accept a
    /// colliding booking.
    pub async fn invalidate(&self, key: &WeekKey) -> Result<(), DomainError> {
        self.cache.invalidate(key).await
    }
}

/// Same bookings at the same versions, in any order.
fn same_rows(a: &[Booking], b: &[Booking]) -> bool {
    let mut left: Vec<_> = a.iter().map(|x| (x.id, x.version)).collect();
    let mut right: Vec<_> = b.iter().map(|x| (x.id, x.version)).collect();
    left.sort();
    right.sort();
    left == right
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::in_memory::{InMemoryScheduleCache, InMemoryScheduleStore};
    use crate::domain::foundation::{StudentId, TeacherId, Timestamp, YearWeek};
    use crate::domain::schedule::{BookingIntent, WeeklySlots};

    fn week() -> YearWeek {
        YearWeek::new(2024, 10).unwrap()
    }

    fn key() -> WeekKey {
        WeekKey::new(TeacherId::new("tch-1").unwrap(), week())
    }

    fn booking(student: &str) -> Booking {
        let intent = BookingIntent {
            teacher_id: TeacherId::new("tch-1").unwrap(),
            teacher_name: "Grace".to_string(),
            student_id: StudentId::new(student).unwrap(),
            student_name: student.to_string(),
            slots: WeeklySlots::from_array([Some(3), None, None, None, None]),
        };
        Booking::from_intent(&intent, week(), Timestamp::now())
    }

    fn setup() -> (Arc<InMemoryScheduleStore>, Arc<InMemoryScheduleCache>, WeeklyScheduleCache) {
        let store = Arc::new(InMemoryScheduleStore::new());
        let cache = Arc::new(InMemoryScheduleCache::new());
        let roster = WeeklyScheduleCache::new(store.clone(), cache.clone());
        (store, cache, roster)
    }

    #[tokio::test]
    async fn miss_loads_from_store_and_fills_cache() {
        let (store, cache, roster) = setup();
        store.upsert(&booking("stu-1")).await.unwrap();

        let loaded = roster.load(&key()).await.unwrap();

        assert_eq!(loaded.len(), 1);
        assert!(cache.contains(&key()).await);
    }

    #[tokio::test]
    async fn hit_does_not_touch_store() {
        let (store, _cache, roster) = setup();
        roster.load(&key()).await.unwrap();

        store.set_unavailable(true);
        let loaded = roster.load(&key()).await.unwrap();

        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn read_after_invalidate_reflects_new_write() {
        let (store, _cache, roster) = setup();
        assert!(roster.load(&key()).await.unwrap().is_empty());

        store.upsert(&booking("stu-1")).await.unwrap();
        roster.invalidate(&key()).await.unwrap();

        let loaded = roster.load(&key()).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].student_id.as_str(), "stu-1");
    }

    #[tokio::test]
    async fn confirm_replaces_stale_entry_with_store_rows() {
        let (store, cache, roster) = setup();
        let cached = roster.load(&key()).await.unwrap();
        assert!(cached.is_empty());

        // Written without going through the roster
        store.upsert(&booking("stu-1")).await.unwrap();

        let confirmed = roster.confirm(&key(), &cached).await.unwrap();
        assert_eq!(confirmed.len(), 1);
        assert_eq!(roster.load(&key()).await.unwrap().len(), 1);
        assert!(cache.contains(&key()).await);
    }

    #[tokio::test]
    async fn confirm_of_current_entry_returns_same_rows() {
        let (store, _cache, roster) = setup();
        store.upsert(&booking("stu-1")).await.unwrap();
        let cached = roster.load(&key()).await.unwrap();

        let confirmed = roster.confirm(&key(), &cached).await.unwrap();
        assert_eq!(confirmed, cached);
    }

    #[tokio::test]
    async fn store_failure_on_miss_is_returned() {
        let (store, cache, roster) = setup();
        store.set_unavailable(true);

        assert!(roster.load(&key()).await.is_err());
        assert!(!cache.contains(&key()).await);
    }
}
