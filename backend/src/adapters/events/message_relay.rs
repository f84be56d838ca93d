//! MessageRelay - moves outbox records onto the broker.
//!
//! Second half of the Transactional Outbox Pattern. Two triggers:
//!
//! 1. **Immediate publish** after the writing transaction commits. Best
//!    effort: a failure leaves the record in place and is only logged.
//! 2. **Periodic sweep** over every record still in the outbox. This is
//!    what recovers from a crash between commit and immediate publish,
//!    or from a broker outage.
//!
//! A record is deleted only after the broker accepted it. Republishing a
//! record that was delivered but not yet deleted is harmless because the
//! consumer deduplicates on the idempotency key.
//!
//! ## Configuration
//!
//! | Setting | Default | Description |
//! |---------|---------|-------------|
//! | `sweep_interval_ms` | 10000 | Delay between sweeps |
//! | `initial_delay_ms` | 5000 | Delay before the first sweep |
//! | `sweep_batch_size` | 500 | Max records republished per sweep |

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::RelayConfig;
use crate::domain::foundation::{DomainError, EVENT_TYPE_HEADER, IDEMPOTENCY_KEY_HEADER};
use crate::ports::{BrokerMessage, MessagePublisher, OutboxRecord, OutboxWriter};

/// Result of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub published: usize,
    pub failed: usize,
}

/// Publishes outbox records to a single topic.
pub struct MessageRelay {
    outbox: Arc<dyn OutboxWriter>,
    publisher: Arc<dyn MessagePublisher>,
    topic: String,
    config: RelayConfig,
}

impl MessageRelay {
    pub fn new(
        outbox: Arc<dyn OutboxWriter>,
        publisher: Arc<dyn MessagePublisher>,
        topic: impl Into<String>,
        config: RelayConfig,
    ) -> Self {
        Self {
            outbox,
            publisher,
            topic: topic.into(),
            config,
        }
    }

    /// Sends one record and deletes it once the broker has accepted it.
    pub async fn publish_record(&self, record: &OutboxRecord) -> Result<(), DomainError> {
        let message = to_message(record);
        self.publisher.send(&self.topic, &message).await?;
        self.outbox.delete(record.id).await?;

        tracing::debug!(
            outbox_id = %record.id,
            idempotency_key = %record.idempotency_key,
            topic = %self.topic,
            "Outbox record published"
        );
        Ok(())
    }

    /// Fire-and-forget publish for a record whose transaction just committed.
    ///
    /// Never reports failure to the caller; the sweep picks the record up.
    pub fn spawn_immediate(self: &Arc<Self>, record: OutboxRecord) -> JoinHandle<()> {
        let relay = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = relay.publish_record(&record).await {
                tracing::warn!(
                    outbox_id = %record.id,
                    idempotency_key = %record.idempotency_key,
                    error = %e,
                    "Immediate publish failed, leaving record for the sweep"
                );
            }
        })
    }

    /// Republishes every remaining record, oldest first.
    ///
    /// A failed record does not stop the sweep; it stays for the next one.
    pub async fn sweep(&self) -> Result<SweepReport, DomainError> {
        let records = self.outbox.pending(self.config.sweep_batch_size).await?;
        let mut report = SweepReport::default();

        for record in &records {
            match self.publish_record(record).await {
                Ok(()) => report.published += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        outbox_id = %record.id,
                        idempotency_key = %record.idempotency_key,
                        error = %e,
                        "Sweep failed to publish outbox record"
                    );
                }
            }
        }

        if !records.is_empty() {
            tracing::info!(
                published = report.published,
                failed = report.failed,
                topic = %self.topic,
                "Outbox sweep finished"
            );
        }
        Ok(report)
    }

    /// Runs the periodic sweep until shutdown is signalled.
    ///
    /// Performs one final sweep before returning.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let start = Instant::now() + self.config.initial_delay();
        let mut interval = time::interval_at(start, self.config.sweep_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            topic = %self.topic,
            interval_ms = self.config.sweep_interval_ms,
            "Outbox relay started"
        );

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        self.sweep_logged().await;
                        tracing::info!(topic = %self.topic, "Outbox relay stopped");
                        return;
                    }
                }

                _ = interval.tick() => {
                    self.sweep_logged().await;
                }
            }
        }
    }

    async fn sweep_logged(&self) {
        if let Err(e) = self.sweep().await {
            tracing::error!(error = %e, topic = %self.topic, "Outbox sweep could not read pending records");
        }
    }
}

fn to_message(record: &OutboxRecord) -> BrokerMessage {
    BrokerMessage::new(record.payload.clone())
        .with_header(IDEMPOTENCY_KEY_HEADER, record.idempotency_key.as_str())
        .with_header(EVENT_TYPE_HEADER, record.event_type.as_str())
}
