//! Axum router configuration for booking endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{apply_booking, get_booking_status, BookingAppState};

/// Create the booking API router.
///
/// # Routes
///
/// - `POST /` - Request weekly slots (202 with the idempotency key)
/// - `GET /requests/:key` - Decision for an earlier request
pub fn booking_routes() -> Router<BookingAppState> {
    Router::new()
        .route("/", post(apply_booking))
        .route("/requests/:key", get(get_booking_status))
}

/// Booking routes mounted at `/api/courses`.
pub fn booking_router() -> Router<BookingAppState> {
    Router::new().nest("/api/courses", booking_routes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::{MessageRelay, OutboxPublisher};
    use crate::adapters::identity::MockIdentityLookup;
    use crate::adapters::in_memory::{InMemoryBookingOutcomeStore, InMemoryBroker, InMemoryOutbox};
    use crate::config::RelayConfig;
    use crate::domain::foundation::{BookingId, IdempotencyKey, StudentId, TeacherId};
    use crate::domain::schedule::MemberIdentity;
    use crate::ports::{BookingOutcome, BookingOutcomeStore};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    const TOKEN: &str = "Bearer token-1";

    struct Fixture {
        outbox: Arc<InMemoryOutbox>,
        outcomes: Arc<InMemoryBookingOutcomeStore>,
        app: Router,
    }

    fn fixture() -> Fixture {
        let outbox = Arc::new(InMemoryOutbox::new());
        let broker = Arc::new(InMemoryBroker::new());
        broker.set_failing(true);
        let relay = Arc::new(MessageRelay::new(
            outbox.clone(),
            broker,
            "course-created",
            RelayConfig::default(),
        ));
        let outcomes = Arc::new(InMemoryBookingOutcomeStore::new());
        let identity = MockIdentityLookup::new().with_identity(
            TOKEN,
            MemberIdentity {
                student_id: StudentId::new("stu-1").unwrap(),
                student_name: "Ada".to_string(),
                teacher_id: TeacherId::new("tch-1").unwrap(),
                teacher_name: "Grace".to_string(),
            },
        );

        let state = BookingAppState {
            identity: Arc::new(identity),
            publisher: Arc::new(OutboxPublisher::new(outbox.clone(), relay)),
            outcomes: outcomes.clone(),
            max_slot_hour: 12,
        };
        Fixture {
            outbox,
            outcomes,
            app: booking_router().with_state(state),
        }
    }

    fn post(body: &str, key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/courses")
            .header("content-type", "application/json")
            .header("authorization", TOKEN);
        if let Some(key) = key {
            builder = builder.header("Idempotency-Key", key);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn post_returns_accepted_with_key() {
        let f = fixture();

        let response = f
            .app
            .oneshot(post(r#"{"mondayHour":3}"#, Some("client-1")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let json = body_json(response).await;
        assert_eq!(json["idempotencyKey"], "stu-1:client-1");
        assert_eq!(json["status"], "PENDING");
        assert_eq!(f.outbox.len().await, 1);
    }

    #[tokio::test]
    async fn post_rejects_out_of_range_hour() {
        let f = fixture();

        let response = f
            .app
            .oneshot(post(r#"{"tuesdayHour":13}"#, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(f.outbox.is_empty().await);
    }

    #[tokio::test]
    async fn post_without_token_is_unauthorized() {
        let f = fixture();
        let request = Request::builder()
            .method("POST")
            .uri("/api/courses")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"mondayHour":3}"#))
            .unwrap();

        let response = f.app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn status_is_pending_then_recorded_outcome() {
        let f = fixture();
        let pending = f
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/courses/requests/k-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(pending.status(), StatusCode::OK);
        assert_eq!(body_json(pending).await["status"], "PENDING");

        f.outcomes
            .record(
                &IdempotencyKey::from_string("k-1").unwrap(),
                &BookingOutcome::Accepted {
                    booking_id: BookingId::new(),
                },
            )
            .await
            .unwrap();

        let accepted = f
            .app
            .oneshot(
                Request::builder()
                    .uri("/api/courses/requests/k-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json = body_json(accepted).await;
        assert_eq!(json["status"], "ACCEPTED");
        assert!(json["bookingId"].is_string());
    }
}
