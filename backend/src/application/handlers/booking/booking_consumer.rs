//! BookingConsumer - turns delivered booking intents into schedule rows.
//!
//! Per message, in batch order:
//!
//! ```text
//! PARSE -> CLAIM -> LOCK(teacher) -> LOAD ROSTER -> CONFIRM IN STORE -> VALIDATE
//!       -> WRITE -> INVALIDATE -> UNLOCK
//! ```
//!
//! A duplicate (claim refused) is skipped and a conflict is recorded as a
//! rejection; both are terminal and do not fail the batch. A lock timeout
//! or any infrastructure fault aborts the whole batch, which is then left
//! unacknowledged for redelivery. The claim of the aborting message is
//! released first so the redelivery is not mistaken for a duplicate.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;

use crate::application::WeeklyScheduleCache;
use crate::config::BookingConfig;
use crate::domain::foundation::{
    current_year_week, BookingId, Clock, DomainError, ErrorCode, EventType, IdempotencyKey,
    TeacherId,
};
use crate::domain::schedule::{Booking, BookingIntent, ConflictValidator, ScheduleConflict, Verdict, WeekKey};
use crate::ports::{
    teacher_lock_key, BookingOutcome, BookingOutcomeStore, DeliveredMessage, DeliveryId,
    DistributedLock, IdempotencyGuard, MessageSource, ScheduleStore,
};

/// Reasons a batch is left unacknowledged.
#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("lock for teacher {teacher_id} not acquired within {waited:?}")]
    LockTimeout { teacher_id: TeacherId, waited: Duration },

    #[error("message {delivery_id} has an unreadable payload: {reason}")]
    Serialization { delivery_id: DeliveryId, reason: String },

    #[error(transparent)]
    Infrastructure(#[from] DomainError),
}

impl ConsumerError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ConsumerError::LockTimeout { .. } => ErrorCode::LockTimeout,
            ConsumerError::Serialization { .. } => ErrorCode::SerializationError,
            ConsumerError::Infrastructure(e) => e.code,
        }
    }

    /// True when the redelivered batch is expected to go through.
    pub fn is_transient(&self) -> bool {
        self.code().is_transient()
    }
}

/// Terminal outcome of one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    Applied(BookingId),
    Duplicate,
    Rejected(ScheduleConflict),
    /// Event type this consumer does not handle
    Skipped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub applied: usize,
    pub duplicates: usize,
    pub rejected: usize,
    pub skipped: usize,
}

impl BatchReport {
    fn count(&mut self, outcome: &MessageOutcome) {
        match outcome {
            MessageOutcome::Applied(_) => self.applied += 1,
            MessageOutcome::Duplicate => self.duplicates += 1,
            MessageOutcome::Rejected(_) => self.rejected += 1,
            MessageOutcome::Skipped => self.skipped += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.applied + self.duplicates + self.rejected + self.skipped
    }
}

/// Collaborators of the consumer.
#[derive(Clone)]
pub struct BookingConsumerPorts {
    pub source: Arc<dyn MessageSource>,
    pub guard: Arc<dyn IdempotencyGuard>,
    pub lock: Arc<dyn DistributedLock>,
    pub store: Arc<dyn ScheduleStore>,
    pub roster: Arc<WeeklyScheduleCache>,
    pub outcomes: Arc<dyn BookingOutcomeStore>,
    pub clock: Arc<dyn Clock>,
}

pub struct BookingConsumer {
    ports: BookingConsumerPorts,
    config: BookingConfig,
    topic: String,
    batch_size: usize,
    idle_backoff: Duration,
}

impl BookingConsumer {
    pub fn new(
        ports: BookingConsumerPorts,
        config: BookingConfig,
        topic: impl Into<String>,
        batch_size: usize,
    ) -> Self {
        Self {
            ports,
            config,
            topic: topic.into(),
            batch_size,
            idle_backoff: Duration::from_millis(200),
        }
    }

    /// Pause after an empty or aborted batch.
    pub fn with_idle_backoff(mut self, backoff: Duration) -> Self {
        self.idle_backoff = backoff;
        self
    }

    /// Consumes until shutdown is signalled.
    ///
    /// Shutdown is only observed between batches so a critical section is
    /// never cut short.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(topic = %self.topic, "Booking consumer started");

        while !*shutdown.borrow() {
            let idle = match self.poll_once().await {
                Ok(Some(_)) => false,
                Ok(None) => true,
                Err(e) if e.is_transient() => {
                    tracing::warn!(
                        topic = %self.topic,
                        error_code = %e.code(),
                        error = %e,
                        "Booking batch aborted, will be redelivered"
                    );
                    true
                }
                Err(e) => {
                    tracing::error!(
                        topic = %self.topic,
                        error_code = %e.code(),
                        error = %e,
                        "Booking batch aborted on a message that will not succeed on retry"
                    );
                    true
                }
            };

            if idle {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = tokio::time::sleep(self.idle_backoff) => {}
                }
            }
        }

        tracing::info!(topic = %self.topic, "Booking consumer stopped");
    }

    /// Polls one batch, processes it and settles it with the broker.
    ///
    /// Returns `None` when the broker had nothing to deliver.
    pub async fn poll_once(&self) -> Result<Option<BatchReport>, ConsumerError> {
        let batch = self
            .ports
            .source
            .poll_batch(&self.topic, self.batch_size)
            .await?;
        if batch.is_empty() {
            return Ok(None);
        }

        let ids: Vec<DeliveryId> = batch.iter().map(|m| m.id.clone()).collect();
        match self.process_batch(&batch).await {
            Ok(report) => {
                self.ports.source.ack(&self.topic, &ids).await?;
                tracing::info!(
                    topic = %self.topic,
                    applied = report.applied,
                    rejected = report.rejected,
                    duplicates = report.duplicates,
                    skipped = report.skipped,
                    "Booking batch acknowledged"
                );
                Ok(Some(report))
            }
            Err(e) => {
                if let Err(nack_err) = self.ports.source.nack(&self.topic, &ids).await {
                    tracing::error!(topic = %self.topic, error = %nack_err, "Failed to nack batch");
                }
                Err(e)
            }
        }
    }

    /// Brings every message of the batch to a terminal outcome, or stops
    /// at the first message that cannot be settled.
    pub async fn process_batch(
        &self,
        batch: &[DeliveredMessage],
    ) -> Result<BatchReport, ConsumerError> {
        let mut report = BatchReport::default();
        for delivered in batch {
            let outcome = self.process_message(delivered).await?;
            report.count(&outcome);
        }
        Ok(report)
    }

    async fn process_message(
        &self,
        delivered: &DeliveredMessage,
    ) -> Result<MessageOutcome, ConsumerError> {
        let message = &delivered.message;

        if let Some(event_type) = message.event_type() {
            if event_type.parse::<EventType>().is_err() {
                tracing::warn!(
                    delivery_id = %delivered.id,
                    event_type,
                    "Skipping message with unknown event type"
                );
                return Ok(MessageOutcome::Skipped);
            }
        }

        let intent: BookingIntent =
            serde_json::from_str(&message.payload).map_err(|e| ConsumerError::Serialization {
                delivery_id: delivered.id.clone(),
                reason: e.to_string(),
            })?;

        let key = match message.idempotency_key().map(IdempotencyKey::from_string) {
            Some(Ok(key)) => Some(key),
            Some(Err(e)) => {
                tracing::warn!(delivery_id = %delivered.id, error = %e, "Ignoring unusable idempotency key");
                None
            }
            None => None,
        };

        if let Some(key) = &key {
            if !self.ports.guard.claim(key).await? {
                tracing::debug!(idempotency_key = %key, "Duplicate delivery skipped");
                return Ok(MessageOutcome::Duplicate);
            }
        }

        let result = self.apply_locked(&intent, key.as_ref()).await;

        if let (Err(e), Some(key)) = (&result, &key) {
            tracing::debug!(idempotency_key = %key, error = %e, "Releasing claim of aborted message");
            if let Err(release_err) = self.ports.guard.release(key).await {
                tracing::error!(
                    idempotency_key = %key,
                    error = %release_err,
                    "Failed to release claim; redelivery will be treated as duplicate"
                );
            }
        }
        result
    }

    async fn apply_locked(
        &self,
        intent: &BookingIntent,
        key: Option<&IdempotencyKey>,
    ) -> Result<MessageOutcome, ConsumerError> {
        let resource = teacher_lock_key(&intent.teacher_id);
        let wait = self.config.lock_wait();
        let handle = self
            .ports
            .lock
            .try_acquire(&resource, wait, self.config.lock_lease())
            .await?
            .ok_or_else(|| {
                tracing::warn!(teacher_id = %intent.teacher_id, "Teacher lock wait timed out");
                ConsumerError::LockTimeout {
                    teacher_id: intent.teacher_id.clone(),
                    waited: wait,
                }
            })?;

        let result = self.apply(intent, key).await;

        match self.ports.lock.release(&handle).await {
            Ok(true) => {}
            Ok(false) => tracing::warn!(
                teacher_id = %intent.teacher_id,
                "Teacher lock lease expired before release"
            ),
            Err(e) => tracing::warn!(
                teacher_id = %intent.teacher_id,
                error = %e,
                "Failed to release teacher lock"
            ),
        }
        result
    }

    /// Runs with the teacher lock held.
    async fn apply(
        &self,
        intent: &BookingIntent,
        key: Option<&IdempotencyKey>,
    ) -> Result<MessageOutcome, ConsumerError> {
        let week = current_year_week(self.ports.clock.as_ref());
        let week_key = WeekKey::new(intent.teacher_id.clone(), week);
        // The cached roster is only a hint; the verdict uses the store's rows
        let cached = self.ports.roster.load(&week_key).await?;
        let roster = self.ports.roster.confirm(&week_key, &cached).await?;

        if let Verdict::Conflict(conflict) = ConflictValidator::validate(intent, &roster) {
            tracing::info!(
                teacher_id = %intent.teacher_id,
                student_id = %intent.student_id,
                day = %conflict.day,
                hour = conflict.hour,
                existing_student_id = %conflict.existing_student_id,
                "Booking rejected"
            );
            if let Some(key) = key {
                let outcome = BookingOutcome::Rejected {
                    reason: conflict.to_string(),
                };
                self.ports.outcomes.record(key, &outcome).await?;
            }
            return Ok(MessageOutcome::Rejected(conflict));
        }

        let now = self.ports.clock.now();
        let (booking, previous_key) = match self
            .ports
            .store
            .find_by_student_and_week(&intent.student_id, week)
            .await?
        {
            Some(mut existing) => {
                let previous = existing.week_key();
                existing.apply_intent(intent, now);
                (existing, Some(previous))
            }
            None => (Booking::from_intent(intent, week, now), None),
        };

        let saved = self.ports.store.upsert(&booking).await?;

        self.ports.roster.invalidate(&week_key).await?;
        if let Some(previous) = previous_key.filter(|k| k != &week_key) {
            self.ports.roster.invalidate(&previous).await?;
        }

        if let Some(key) = key {
            let outcome = BookingOutcome::Accepted { booking_id: saved.id };
            self.ports.outcomes.record(key, &outcome).await?;
        }

        tracing::info!(
            booking_id = %saved.id,
            teacher_id = %saved.teacher_id,
            student_id = %saved.student_id,
            week = %saved.week,
            version = saved.version,
            "Booking applied"
        );
        Ok(MessageOutcome::Applied(saved.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::in_memory::{
        InMemoryBookingOutcomeStore, InMemoryBroker, InMemoryDistributedLock,
        InMemoryIdempotencyGuard, InMemoryScheduleCache, InMemoryScheduleStore,
    };
    use crate::domain::foundation::{
        FixedClock, StudentId, Timestamp, YearWeek, EVENT_TYPE_HEADER, IDEMPOTENCY_KEY_HEADER,
    };
    use crate::domain::schedule::{Weekday, WeeklySlots};
    use crate::ports::{BrokerMessage, MessagePublisher};
    use chrono::{TimeZone, Utc};

    const TOPIC: &str = "course-created";

    struct Harness {
        broker: Arc<InMemoryBroker>,
        guard: Arc<InMemoryIdempotencyGuard>,
        lock: Arc<InMemoryDistributedLock>,
        store: Arc<InMemoryScheduleStore>,
        roster: Arc<WeeklyScheduleCache>,
        outcomes: Arc<InMemoryBookingOutcomeStore>,
        consumer: BookingConsumer,
    }

    fn harness() -> Harness {
        let broker = Arc::new(InMemoryBroker::new());
        let guard = Arc::new(InMemoryIdempotencyGuard::new());
        let lock = Arc::new(InMemoryDistributedLock::new());
        let store = Arc::new(InMemoryScheduleStore::new());
        let cache = Arc::new(InMemoryScheduleCache::new());
        let outcomes = Arc::new(InMemoryBookingOutcomeStore::new());
        let roster = Arc::new(WeeklyScheduleCache::new(store.clone(), cache));
        let clock = FixedClock::at(Utc.with_ymd_and_hms(2024, 3, 6, 9, 0, 0).unwrap());

        let ports = BookingConsumerPorts {
            source: broker.clone(),
            guard: guard.clone(),
            lock: lock.clone(),
            store: store.clone(),
            roster: roster.clone(),
            outcomes: outcomes.clone(),
            clock: Arc::new(clock),
        };
        let config = BookingConfig {
            lock_wait_ms: 50,
            lock_lease_ms: 1_000,
            ..Default::default()
        };

        Harness {
            broker,
            guard,
            lock,
            store,
            roster,
            outcomes,
            consumer: BookingConsumer::new(ports, config, TOPIC, 10),
        }
    }

    fn intent(student: &str, monday: Option<u8>) -> BookingIntent {
        BookingIntent {
            teacher_id: TeacherId::new("tch-1").unwrap(),
            teacher_name: "Grace".to_string(),
            student_id: StudentId::new(student).unwrap(),
            student_name: student.to_string(),
            slots: WeeklySlots::from_array([monday, None, None, None, None]),
        }
    }

    async fn send(h: &Harness, key: &str, intent: &BookingIntent) {
        let message = BrokerMessage::new(serde_json::to_string(intent).unwrap())
            .with_header(IDEMPOTENCY_KEY_HEADER, key)
            .with_header(EVENT_TYPE_HEADER, "CREATED");
        h.broker.send(TOPIC, &message).await.unwrap();
    }

    fn key(s: &str) -> IdempotencyKey {
        IdempotencyKey::from_string(s).unwrap()
    }

    #[tokio::test]
    async fn applies_new_booking_and_acks() {
        let h = harness();
        send(&h, "k-1", &intent("stu-a", Some(3))).await;

        let report = h.consumer.poll_once().await.unwrap().unwrap();

        assert_eq!(report.applied, 1);
        assert_eq!(h.broker.acked(TOPIC).await, 1);
        let rows = h.store.all().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].week, YearWeek::new(2024, 10).unwrap());
        assert!(matches!(
            h.outcomes.find(&key("k-1")).await.unwrap(),
            Some(BookingOutcome::Accepted { .. })
        ));
    }

    #[tokio::test]
    async fn duplicate_delivery_is_skipped() {
        let h = harness();
        send(&h, "k-1", &intent("stu-a", Some(3))).await;
        send(&h, "k-1", &intent("stu-a", Some(3))).await;

        let report = h.consumer.poll_once().await.unwrap().unwrap();

        assert_eq!(report.applied, 1);
        assert_eq!(report.duplicates, 1);
        assert_eq!(h.store.all().await.len(), 1);
        assert_eq!(h.store.all().await[0].version, 1);
    }

    #[tokio::test]
    async fn conflict_is_recorded_and_batch_still_acked() {
        let h = harness();
        send(&h, "k-a", &intent("stu-a", Some(3))).await;
        send(&h, "k-b", &intent("stu-b", Some(3))).await;
        send(&h, "k-c", &intent("stu-c", Some(4))).await;

        let report = h.consumer.poll_once().await.unwrap().unwrap();

        assert_eq!(report.applied, 2);
        assert_eq!(report.rejected, 1);
        assert_eq!(h.broker.acked(TOPIC).await, 3);
        match h.outcomes.find(&key("k-b")).await.unwrap() {
            Some(BookingOutcome::Rejected { reason }) => assert!(reason.contains("MONDAY")),
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn stale_cached_roster_does_not_admit_a_colliding_booking() {
        let h = harness();
        let week_key = WeekKey::new(TeacherId::new("tch-1").unwrap(), YearWeek::new(2024, 10).unwrap());
        assert!(h.roster.load(&week_key).await.unwrap().is_empty());

        // Row written behind the cache's back
        let existing = Booking::from_intent(
            &intent("stu-a", Some(3)),
            YearWeek::new(2024, 10).unwrap(),
            Timestamp::now(),
        );
        h.store.upsert(&existing).await.unwrap();

        send(&h, "k-b", &intent("stu-b", Some(3))).await;
        let report = h.consumer.poll_once().await.unwrap().unwrap();

        assert_eq!(report.rejected, 1);
        assert_eq!(report.applied, 0);
        let rows = h.store.all().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].student_id.as_str(), "stu-a");
        assert!(matches!(
            h.outcomes.find(&key("k-b")).await.unwrap(),
            Some(BookingOutcome::Rejected { .. })
        ));
        assert_eq!(h.roster.load(&week_key).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn resubmission_by_same_student_updates_in_place() {
        let h = harness();
        send(&h, "k-1", &intent("stu-a", Some(3))).await;
        send(&h, "k-2", &intent("stu-a", Some(3))).await;
        send(&h, "k-3", &intent("stu-a", Some(5))).await;

        let report = h.consumer.poll_once().await.unwrap().unwrap();

        assert_eq!(report.applied, 3);
        let rows = h.store.all().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].version, 3);
        assert_eq!(rows[0].slots.booked_hour(Weekday::Monday), Some(5));
    }

    #[tokio::test]
    async fn lock_timeout_aborts_batch_and_releases_claim() {
        let h = harness();
        send(&h, "k-1", &intent("stu-a", Some(3))).await;
        let held = h
            .lock
            .hold(&teacher_lock_key(&TeacherId::new("tch-1").unwrap()), Duration::from_secs(10))
            .await;

        let err = h.consumer.poll_once().await.unwrap_err();

        assert!(matches!(err, ConsumerError::LockTimeout { .. }));
        assert_eq!(err.code(), ErrorCode::LockTimeout);
        assert!(err.is_transient());
        assert_eq!(h.broker.acked(TOPIC).await, 0);
        assert!(!h.guard.is_claimed(&key("k-1")).await);
        assert!(h.store.all().await.is_empty());

        h.lock.release(&held).await.unwrap();
        let report = h.consumer.poll_once().await.unwrap().unwrap();
        assert_eq!(report.applied, 1);
        assert_eq!(h.broker.acked(TOPIC).await, 1);
    }

    #[tokio::test]
    async fn store_fault_aborts_batch_unacked() {
        let h = harness();
        send(&h, "k-1", &intent("stu-a", Some(3))).await;
        h.store.set_unavailable(true);

        let err = h.consumer.poll_once().await.unwrap_err();

        assert!(matches!(err, ConsumerError::Infrastructure(_)));
        assert_eq!(h.broker.acked(TOPIC).await, 0);
        assert!(!h.guard.is_claimed(&key("k-1")).await);

        h.store.set_unavailable(false);
        let report = h.consumer.poll_once().await.unwrap().unwrap();
        assert_eq!(report.applied, 1);
    }

    #[tokio::test]
    async fn malformed_payload_aborts_batch() {
        let h = harness();
        let message = BrokerMessage::new("not json").with_header(IDEMPOTENCY_KEY_HEADER, "k-1");
        h.broker.send(TOPIC, &message).await.unwrap();

        let err = h.consumer.poll_once().await.unwrap_err();

        assert!(matches!(err, ConsumerError::Serialization { .. }));
        assert!(!err.is_transient());
        assert!(!h.guard.is_claimed(&key("k-1")).await);
    }

    #[tokio::test]
    async fn unknown_event_type_is_skipped() {
        let h = harness();
        let message = BrokerMessage::new("{}").with_header(EVENT_TYPE_HEADER, "DELETED");
        h.broker.send(TOPIC, &message).await.unwrap();

        let report = h.consumer.poll_once().await.unwrap().unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(h.broker.acked(TOPIC).await, 1);
    }

    #[tokio::test]
    async fn message_without_key_is_still_applied() {
        let h = harness();
        let payload = serde_json::to_string(&intent("stu-a", Some(2))).unwrap();
        h.broker.send(TOPIC, &BrokerMessage::new(payload)).await.unwrap();

        let report = h.consumer.poll_once().await.unwrap().unwrap();

        assert_eq!(report.applied, 1);
        assert!(h.outcomes.all().await.is_empty());
    }

    #[tokio::test]
    async fn empty_poll_returns_none() {
        let h = harness();
        assert!(h.consumer.poll_once().await.unwrap().is_none());
    }
}
