//! ApplyBookingHandler - accepts a booking request into the outbox.
//!
//! The request succeeds as soon as the intent is durable. Whether the
//! booking is accepted or rejected is decided later by the consumer and
//! is observable through `GetBookingStatusHandler`.

use std::sync::Arc;

use thiserror::Error;

use crate::adapters::events::OutboxPublisher;
use crate::domain::foundation::{DomainError, ErrorCode, EventType, IdempotencyKey, ValidationError};
use crate::domain::schedule::{BookingIntent, WeeklySlots};
use crate::ports::{IdentityError, IdentityLookup};

/// Command to request weekly slots for the calling student.
#[derive(Debug, Clone)]
pub struct ApplyBookingCommand {
    /// Bearer token forwarded to the member service
    pub auth_token: String,
    pub slots: WeeklySlots,
    /// Client-chosen key, stored prefixed with the student id; generated
    /// when absent
    pub idempotency_key: Option<IdempotencyKey>,
}

#[derive(Debug, Clone)]
pub struct ApplyBookingResult {
    pub idempotency_key: IdempotencyKey,
    pub intent: BookingIntent,
}

#[derive(Debug, Error)]
pub enum BookingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("missing credentials")]
    Unauthorized,

    #[error("member service rejected the request: {0}")]
    InvalidRequest(String),

    #[error("caller is not allowed to book")]
    Forbidden,

    #[error("member not found")]
    NotFound,

    #[error("identity service unavailable: {0}")]
    IdentityUnavailable(String),

    #[error("idempotency key {0} was already used")]
    DuplicateRequest(IdempotencyKey),

    #[error(transparent)]
    Infrastructure(DomainError),
}

impl BookingError {
    pub fn code(&self) -> ErrorCode {
        match self {
            BookingError::Validation(_) | BookingError::InvalidRequest(_) => {
                ErrorCode::ValidationFailed
            }
            BookingError::Unauthorized => ErrorCode::Unauthorized,
            BookingError::Forbidden => ErrorCode::Forbidden,
            BookingError::NotFound => ErrorCode::MemberNotFound,
            BookingError::IdentityUnavailable(_) => ErrorCode::IdentityServiceUnavailable,
            BookingError::DuplicateRequest(_) => ErrorCode::ConcurrentModification,
            BookingError::Infrastructure(e) => e.code,
        }
    }
}

impl From<IdentityError> for BookingError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidRequest(msg) => BookingError::InvalidRequest(msg),
            IdentityError::Forbidden => BookingError::Forbidden,
            IdentityError::NotFound => BookingError::NotFound,
            IdentityError::Unavailable(msg) => BookingError::IdentityUnavailable(msg),
        }
    }
}

pub struct ApplyBookingHandler {
    identity: Arc<dyn IdentityLookup>,
    publisher: Arc<OutboxPublisher>,
    max_slot_hour: u8,
}

impl ApplyBookingHandler {
    pub fn new(
        identity: Arc<dyn IdentityLookup>,
        publisher: Arc<OutboxPublisher>,
        max_slot_hour: u8,
    ) -> Self {
        Self {
            identity,
            publisher,
            max_slot_hour,
        }
    }

    pub async fn handle(&self, cmd: ApplyBookingCommand) -> Result<ApplyBookingResult, BookingError> {
        // 1. Cheap checks before calling out
        if cmd.auth_token.trim().is_empty() {
            return Err(BookingError::Unauthorized);
        }
        cmd.slots.validate(self.max_slot_hour)?;

        // 2. Resolve student and teacher
        let identity = self.identity.student_info(&cmd.auth_token).await?;
        let intent = BookingIntent::new(identity, cmd.slots);

        // 3. Durable intent; delivery continues in the background
        let requested_key = cmd
            .idempotency_key
            .map(|key| key.scoped_to(&intent.student_id));
        let record = self
            .publisher
            .publish(EventType::Created, &intent, requested_key.clone())
            .await
            .map_err(|e| match (e.code, requested_key) {
                (ErrorCode::ValidationFailed, Some(key)) => BookingError::DuplicateRequest(key),
                _ => BookingError::Infrastructure(e),
            })?;

        tracing::info!(
            idempotency_key = %record.idempotency_key,
            student_id = %intent.student_id,
            teacher_id = %intent.teacher_id,
            "Booking request accepted"
        );

        Ok(ApplyBookingResult {
            idempotency_key: record.idempotency_key,
            intent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::MessageRelay;
    use crate::adapters::identity::MockIdentityLookup;
    use crate::adapters::in_memory::{InMemoryBroker, InMemoryOutbox};
    use crate::config::RelayConfig;
    use crate::domain::foundation::{StudentId, TeacherId};
    use crate::domain::schedule::MemberIdentity;

    const TOKEN: &str = "Bearer stu-1-token";

    fn identity() -> MemberIdentity {
        MemberIdentity {
            student_id: StudentId::new("stu-1").unwrap(),
            student_name: "Ada".to_string(),
            teacher_id: TeacherId::new("tch-1").unwrap(),
            teacher_name: "Grace".to_string(),
        }
    }

    fn handler_with(lookup: MockIdentityLookup) -> (Arc<InMemoryOutbox>, Arc<MockIdentityLookup>, ApplyBookingHandler) {
        let outbox = Arc::new(InMemoryOutbox::new());
        let broker = Arc::new(InMemoryBroker::new());
        // Keep records in the outbox so tests can inspect them
        broker.set_failing(true);
        let relay = Arc::new(MessageRelay::new(
            outbox.clone(),
            broker,
            "course-created",
            RelayConfig::default(),
        ));
        let publisher = Arc::new(OutboxPublisher::new(outbox.clone(), relay));
        let lookup = Arc::new(lookup);
        let handler = ApplyBookingHandler::new(lookup.clone(), publisher, 12);
        (outbox, lookup, handler)
    }

    fn command(slots: [Option<u8>; 5]) -> ApplyBookingCommand {
        ApplyBookingCommand {
            auth_token: TOKEN.to_string(),
            slots: WeeklySlots::from_array(slots),
            idempotency_key: None,
        }
    }

    #[tokio::test]
    async fn writes_intent_to_outbox() {
        let (outbox, _, handler) =
            handler_with(MockIdentityLookup::new().with_identity(TOKEN, identity()));

        let result = handler
            .handle(command([Some(3), None, None, Some(0), None]))
            .await
            .unwrap();

        let records = outbox.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].idempotency_key, result.idempotency_key);
        let stored: BookingIntent = serde_json::from_str(&records[0].payload).unwrap();
        assert_eq!(stored, result.intent);
        assert_eq!(stored.teacher_id.as_str(), "tch-1");
    }

    #[tokio::test]
    async fn keeps_client_key() {
        let (_, _, handler) =
            handler_with(MockIdentityLookup::new().with_identity(TOKEN, identity()));
        let key = IdempotencyKey::from_string("client-1").unwrap();

        let mut cmd = command([Some(3), None, None, None, None]);
        cmd.idempotency_key = Some(key.clone());
        let result = handler.handle(cmd.clone()).await.unwrap();
        assert_eq!(result.idempotency_key.as_str(), "stu-1:client-1");

        let again = handler.handle(cmd).await.unwrap_err();
        assert!(matches!(again, BookingError::DuplicateRequest(_)));
    }

    #[tokio::test]
    async fn same_client_key_from_two_students_stays_apart() {
        let other = MemberIdentity {
            student_id: StudentId::new("stu-2").unwrap(),
            student_name: "Alan".to_string(),
            ..identity()
        };
        let (outbox, _, handler) = handler_with(
            MockIdentityLookup::new()
                .with_identity(TOKEN, identity())
                .with_identity("Bearer stu-2-token", other),
        );
        let key = IdempotencyKey::from_string("1").unwrap();

        let mut first = command([Some(3), None, None, None, None]);
        first.idempotency_key = Some(key.clone());
        let mut second = first.clone();
        second.auth_token = "Bearer stu-2-token".to_string();

        let a = handler.handle(first).await.unwrap();
        let b = handler.handle(second).await.unwrap();

        assert_ne!(a.idempotency_key, b.idempotency_key);
        assert_eq!(outbox.len().await, 2);
    }

    #[tokio::test]
    async fn out_of_range_hour_is_rejected_before_lookup() {
        let (outbox, lookup, handler) =
            handler_with(MockIdentityLookup::new().with_identity(TOKEN, identity()));

        let err = handler
            .handle(command([Some(13), None, None, None, None]))
            .await
            .unwrap_err();

        assert!(matches!(err, BookingError::Validation(_)));
        assert_eq!(lookup.calls(), 0);
        assert!(outbox.is_empty().await);
    }

    #[tokio::test]
    async fn blank_token_is_unauthorized() {
        let (_, _, handler) = handler_with(MockIdentityLookup::new());
        let mut cmd = command([Some(1), None, None, None, None]);
        cmd.auth_token = "  ".to_string();

        assert!(matches!(
            handler.handle(cmd).await.unwrap_err(),
            BookingError::Unauthorized
        ));
    }

    #[tokio::test]
    async fn identity_outage_fails_request_without_outbox_write() {
        let (outbox, _, handler) = handler_with(MockIdentityLookup::failing(
            IdentityError::Unavailable("timeout".to_string()),
        ));

        let err = handler
            .handle(command([Some(1), None, None, None, None]))
            .await
            .unwrap_err();

        assert!(matches!(err, BookingError::IdentityUnavailable(_)));
        assert_eq!(err.code(), ErrorCode::IdentityServiceUnavailable);
        assert!(outbox.is_empty().await);
    }

    #[tokio::test]
    async fn outbox_failure_is_infrastructure_error() {
        let (outbox, _, handler) =
            handler_with(MockIdentityLookup::new().with_identity(TOKEN, identity()));
        outbox.set_unavailable(true);

        let err = handler
            .handle(command([Some(1), None, None, None, None]))
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::DatabaseError);
    }
}
