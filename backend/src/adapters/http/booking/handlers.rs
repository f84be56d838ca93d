//! HTTP handlers for booking endpoints.
//!
//! These handlers connect Axum routes to the booking command and query handlers.

use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;

use crate::adapters::events::OutboxPublisher;
use crate::application::{
    ApplyBookingCommand, ApplyBookingHandler, BookingError, GetBookingStatusHandler,
    GetBookingStatusQuery,
};
use crate::domain::foundation::{DomainError, IdempotencyKey, ValidationError, IDEMPOTENCY_KEY_HEADER};
use crate::ports::{BookingOutcomeStore, IdentityLookup};

use super::dto::{BookingAcceptedResponse, BookingStatusResponse, CourseBookingRequest, ErrorResponse};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for booking routes.
#[derive(Clone)]
pub struct BookingAppState {
    pub identity: Arc<dyn IdentityLookup>,
    pub publisher: Arc<OutboxPublisher>,
    pub outcomes: Arc<dyn BookingOutcomeStore>,
    pub max_slot_hour: u8,
}

impl BookingAppState {
    pub fn apply_booking_handler(&self) -> ApplyBookingHandler {
        ApplyBookingHandler::new(
            self.identity.clone(),
            self.publisher.clone(),
            self.max_slot_hour,
        )
    }

    pub fn booking_status_handler(&self) -> GetBookingStatusHandler {
        GetBookingStatusHandler::new(self.outcomes.clone())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/courses - Request weekly slots for the calling student
pub async fn apply_booking(
    State(state): State<BookingAppState>,
    headers: HeaderMap,
    Json(request): Json<CourseBookingRequest>,
) -> Result<impl IntoResponse, BookingApiError> {
    let auth_token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let idempotency_key = match headers.get(IDEMPOTENCY_KEY_HEADER) {
        None => None,
        Some(value) => {
            let raw = value.to_str().map_err(|_| {
                ValidationError::invalid_format(IDEMPOTENCY_KEY_HEADER, "must be visible ASCII")
            })?;
            Some(IdempotencyKey::from_string(raw)?)
        }
    };

    let cmd = ApplyBookingCommand {
        auth_token,
        slots: request.to_slots(state.max_slot_hour)?,
        idempotency_key,
    };
    let result = state.apply_booking_handler().handle(cmd).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(BookingAcceptedResponse::pending(&result.idempotency_key)),
    ))
}

/// GET /api/courses/requests/:key - Decision for an earlier request
pub async fn get_booking_status(
    State(state): State<BookingAppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, BookingApiError> {
    let idempotency_key = IdempotencyKey::from_string(key)?;
    let query = GetBookingStatusQuery {
        idempotency_key: idempotency_key.clone(),
    };
    let status = state.booking_status_handler().handle(query).await?;

    Ok(Json(BookingStatusResponse {
        idempotency_key: idempotency_key.to_string(),
        status,
    }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error wrapper for booking errors.
#[derive(Debug)]
pub struct BookingApiError(BookingError);

impl From<BookingError> for BookingApiError {
    fn from(err: BookingError) -> Self {
        Self(err)
    }
}

impl From<ValidationError> for BookingApiError {
    fn from(err: ValidationError) -> Self {
        Self(BookingError::Validation(err))
    }
}

impl From<DomainError> for BookingApiError {
    fn from(err: DomainError) -> Self {
        Self(BookingError::Infrastructure(err))
    }
}

impl IntoResponse for BookingApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            BookingError::Validation(_) | BookingError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            BookingError::Unauthorized => StatusCode::UNAUTHORIZED,
            BookingError::Forbidden => StatusCode::FORBIDDEN,
            BookingError::NotFound => StatusCode::NOT_FOUND,
            BookingError::IdentityUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            BookingError::DuplicateRequest(_) => StatusCode::CONFLICT,
            BookingError::Infrastructure(e) => {
                tracing::error!(error = %e, "Booking request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = match &self.0 {
            BookingError::Infrastructure(_) => "Internal error".to_string(),
            other => other.to_string(),
        };
        let body = ErrorResponse::new(self.0.code().to_string(), message);
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::IdentityError;

    #[test]
    fn api_error_maps_identity_outage_to_503() {
        let err = BookingApiError(BookingError::from(IdentityError::Unavailable("down".into())));
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn api_error_maps_duplicate_key_to_409() {
        let key = IdempotencyKey::from_string("k-1").unwrap();
        let err = BookingApiError(BookingError::DuplicateRequest(key));
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn api_error_maps_validation_to_400() {
        let err = BookingApiError::from(ValidationError::empty_field("mondayHour"));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn api_error_hides_infrastructure_detail() {
        let err = BookingApiError::from(DomainError::database("Insert outbox", "connection reset"));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
