//! ScheduleCache port - disposable projection of weekly rosters.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::schedule::{Booking, WeekKey};

/// Port for caching a teacher's weekly bookings.
///
/// Entries are replaced wholesale or dropped, never patched.
#[async_trait]
pub trait ScheduleCache: Send + Sync {
    async fn get(&self, key: &WeekKey) -> Result<Option<Vec<Booking>>, DomainError>;

    async fn put(&self, key: &WeekKey, bookings: &[Booking]) -> Result<(), DomainError>;

    async fn invalidate(&self, key: &WeekKey) -> Result<(), DomainError>;
}
