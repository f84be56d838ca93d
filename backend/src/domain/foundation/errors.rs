//! Error types for the domain layer.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use thiserror::Error;

/// Errors that occur during value object construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' must be between {min} and {max}, got {actual}")]
    OutOfRange {
        field: String,
        min: i32,
        max: i32,
        actual: i32,
    },

    #[error("Field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates an empty field validation error.
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField { field: field.into() }
    }

    /// Creates an out of range validation error.
    pub fn out_of_range(field: impl Into<String>, min: i32, max: i32, actual: i32) -> Self {
        ValidationError::OutOfRange {
            field: field.into(),
            min,
            max,
            actual,
        }
    }

    /// Creates an invalid format validation error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::EmptyField { field }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::InvalidFormat { field, .. } => field,
        }
    }
}

/// Error codes organized by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Validation errors
    ValidationFailed,

    // Not found errors
    MemberNotFound,

    // Concurrency errors
    ConcurrentModification,
    LockTimeout,

    // Authorization errors
    Unauthorized,
    Forbidden,

    // Dependency errors
    IdentityServiceUnavailable,

    // Infrastructure errors
    DatabaseError,
    CacheError,
    BrokerError,
    SerializationError,
}

impl ErrorCode {
    /// True for faults that are expected to clear on retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ErrorCode::LockTimeout
                | ErrorCode::ConcurrentModification
                | ErrorCode::IdentityServiceUnavailable
                | ErrorCode::DatabaseError
                | ErrorCode::CacheError
                | ErrorCode::BrokerError
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::MemberNotFound => "MEMBER_NOT_FOUND",
            ErrorCode::ConcurrentModification => "CONCURRENT_MODIFICATION",
            ErrorCode::LockTimeout => "LOCK_TIMEOUT",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::IdentityServiceUnavailable => "IDENTITY_SERVICE_UNAVAILABLE",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::CacheError => "CACHE_ERROR",
            ErrorCode::BrokerError => "BROKER_ERROR",
            ErrorCode::SerializationError => "SERIALIZATION_ERROR",
        };
        write!(f, "{}", s)
    }
}

/// Standard domain error with code, message, and optional details.
#[derive(Debug, Clone)]
pub struct DomainError {
    pub code: ErrorCode,
    pub message: String,
    pub details: HashMap<String, String>,
}

impl DomainError {
    /// Creates a new domain error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: HashMap::new(),
        }
    }

    /// Creates a validation error for a specific field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::ValidationFailed,
            message: message.into(),
            details: HashMap::new(),
        }
        .with_detail("field", field.into())
    }

    /// Creates a database error with the failing operation in the message.
    pub fn database(operation: &str, cause: impl fmt::Display) -> Self {
        Self::new(ErrorCode::DatabaseError, format!("{}: {}", operation, cause))
    }

    /// Creates a cache error with the failing operation in the message.
    pub fn cache(operation: &str, cause: impl fmt::Display) -> Self {
        Self::new(ErrorCode::CacheError, format!("{}: {}", operation, cause))
    }

    /// Creates a broker error with the failing operation in the message.
    pub fn broker(operation: &str, cause: impl fmt::Display) -> Self {
        Self::new(ErrorCode::BrokerError, format!("{}: {}", operation, cause))
    }

    /// Creates a serialization error.
    pub fn serialization(cause: impl fmt::Display) -> Self {
        Self::new(ErrorCode::SerializationError, cause.to_string())
    }

    /// Adds a detail to the error.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl Error for DomainError {}

impl From<ValidationError> for DomainError {
    fn from(err: ValidationError) -> Self {
        let field = err.field().to_string();
        DomainError::validation(field, err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::serialization(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_out_of_range_displays_correctly() {
        let err = ValidationError::out_of_range("monday_hour", 0, 24, 30);
        assert_eq!(
            format!("{}", err),
            "Field 'monday_hour' must be between 0 and 24, got 30"
        );
    }

    #[test]
    fn domain_error_displays_code_and_message() {
        let err = DomainError::new(ErrorCode::MemberNotFound, "Member not found");
        assert_eq!(format!("{}", err), "[MEMBER_NOT_FOUND] Member not found");
    }

    #[test]
    fn validation_error_converts_with_field_detail() {
        let err: DomainError = ValidationError::empty_field("student_id").into();

        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert_eq!(err.details.get("field"), Some(&"student_id".to_string()));
    }

    #[test]
    fn lock_timeout_is_transient_but_bad_payload_is_not() {
        assert!(ErrorCode::LockTimeout.is_transient());
        assert!(ErrorCode::DatabaseError.is_transient());
        assert!(!ErrorCode::ValidationFailed.is_transient());
        assert!(!ErrorCode::SerializationError.is_transient());
    }
}
