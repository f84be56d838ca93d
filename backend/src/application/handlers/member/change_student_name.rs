//! Student renames arriving from the member service.
//!
//! `ChangeStudentNameHandler` rewrites the stored name on every booking of
//! the student and drops the rosters those bookings belong to.
//! `NameChangeConsumer` feeds it from the member-name-changed stream,
//! acknowledging each message only after the store write succeeded.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::watch;

use crate::application::WeeklyScheduleCache;
use crate::domain::foundation::{Clock, DomainError, StudentId, ValidationError};
use crate::domain::schedule::WeekKey;
use crate::ports::{DeliveredMessage, DeliveryId, MessageSource, ScheduleStore};

/// Payload of a member-name-changed message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeStudentNameCommand {
    pub member_id: StudentId,
    pub new_name: String,
}

impl ChangeStudentNameCommand {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.new_name.trim().is_empty() {
            return Err(ValidationError::empty_field("newName"));
        }
        Ok(())
    }
}

pub struct ChangeStudentNameHandler {
    store: Arc<dyn ScheduleStore>,
    roster: Arc<WeeklyScheduleCache>,
    clock: Arc<dyn Clock>,
}

impl ChangeStudentNameHandler {
    pub fn new(
        store: Arc<dyn ScheduleStore>,
        roster: Arc<WeeklyScheduleCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            roster,
            clock,
        }
    }

    /// Returns how many bookings changed. Reapplying the same name is a no-op.
    pub async fn handle(&self, cmd: ChangeStudentNameCommand) -> Result<usize, DomainError> {
        cmd.validate()?;

        let renamed = self
            .store
            .rename_student(&cmd.member_id, &cmd.new_name, self.clock.now())
            .await?;

        let keys: HashSet<WeekKey> = renamed.iter().map(|b| b.week_key()).collect();
        for key in &keys {
            self.roster.invalidate(key).await?;
        }

        if !renamed.is_empty() {
            tracing::info!(
                student_id = %cmd.member_id,
                bookings = renamed.len(),
                "Student renamed on bookings"
            );
        }
        Ok(renamed.len())
    }
}

/// Consumes name changes one message at a time.
pub struct NameChangeConsumer {
    source: Arc<dyn MessageSource>,
    handler: Arc<ChangeStudentNameHandler>,
    topic: String,
    batch_size: usize,
    idle_backoff: Duration,
}

impl NameChangeConsumer {
    pub fn new(
        source: Arc<dyn MessageSource>,
        handler: Arc<ChangeStudentNameHandler>,
        topic: impl Into<String>,
        batch_size: usize,
    ) -> Self {
        Self {
            source,
            handler,
            topic: topic.into(),
            batch_size,
            idle_backoff: Duration::from_millis(200),
        }
    }

    pub fn with_idle_backoff(mut self, backoff: Duration) -> Self {
        self.idle_backoff = backoff;
        self
    }

    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(topic = %self.topic, "Name change consumer started");

        while !*shutdown.borrow() {
            let busy = match self.poll_once().await {
                Ok(handled) => handled > 0,
                Err(e) => {
                    tracing::warn!(topic = %self.topic, error = %e, "Name change poll failed");
                    false
                }
            };

            if !busy {
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

        tracing::info!(topic = %self.topic, "Name change consumer stopped");
    }

    /// Handles one batch. Returns the number of acknowledged messages.
    pub async fn poll_once(&self) -> Result<usize, DomainError> {
        let batch = self
            .source
            .poll_batch(&self.topic, self.batch_size)
            .await?;

        let mut acked: Vec<DeliveryId> = Vec::new();
        let mut failed: Vec<DeliveryId> = Vec::new();
        for delivered in &batch {
            match self.handle_message(delivered).await {
                Ok(()) => acked.push(delivered.id.clone()),
                Err(e) => {
                    tracing::warn!(
                        delivery_id = %delivered.id,
                        delivery_count = delivered.delivery_count,
                        error = %e,
                        "Name change not applied, leaving for redelivery"
                    );
                    failed.push(delivered.id.clone());
                }
            }
        }

        if !acked.is_empty() {
            self.source.ack(&self.topic, &acked).await?;
        }
        if !failed.is_empty() {
            self.source.nack(&self.topic, &failed).await?;
        }
        Ok(acked.len())
    }

    async fn handle_message(&self, delivered: &DeliveredMessage) -> Result<(), DomainError> {
        let cmd: ChangeStudentNameCommand = serde_json::from_str(&delivered.message.payload)?;
        self.handler.handle(cmd).await?;
        Ok(())
    }
}
