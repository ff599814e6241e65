//! Reservation-specific error types.
//!
//! # HTTP Status Mapping
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | NotFound | 404 |
//! | OverrideNotFound | 404 |
//! | Unauthorized | 403 |
//! | InvalidTransition | 409 |
//! | Unavailable | 409 |
//! | InvalidArgument | 400 |
//! | NotModifiable | 409 |
//! | WebhookRejected | 401 |
//! | UpstreamFailure | 502 |
//! | Infrastructure | 500 |

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, ReservationId, ValidationError};

use super::{ReservationStatus, Subject};

/// Errors surfaced by reservation use cases.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReservationError {
    #[error("Reservation {0} not found")]
    NotFound(ReservationId),

    #[error("No availability override for {subject} on {date}")]
    OverrideNotFound { subject: Subject, date: NaiveDate },

    #[error("Not allowed to access reservation {0}")]
    Unauthorized(ReservationId),

    #[error("Cannot transition reservation from {from} to {to}")]
    InvalidTransition {
        from: ReservationStatus,
        to: ReservationStatus,
    },

    #[error("Subject is not available for the requested dates")]
    Unavailable {
        conflicts: Vec<ReservationId>,
        /// Days closed by an availability override.
        blocked_dates: Vec<NaiveDate>,
    },

    #[error("Invalid {field}: {message}")]
    InvalidArgument { field: String, message: String },

    #[error("Reservation cannot be modified while {status}")]
    NotModifiable { status: ReservationStatus },

    #[error("Webhook rejected: {0}")]
    WebhookRejected(String),

    #[error("Payment gateway failure: {0}")]
    UpstreamFailure(String),

    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl ReservationError {
    pub fn not_found(id: ReservationId) -> Self {
        ReservationError::NotFound(id)
    }

    pub fn override_not_found(subject: Subject, date: NaiveDate) -> Self {
        ReservationError::OverrideNotFound { subject, date }
    }

    pub fn unauthorized(id: ReservationId) -> Self {
        ReservationError::Unauthorized(id)
    }

    pub fn invalid_transition(from: ReservationStatus, to: ReservationStatus) -> Self {
        ReservationError::InvalidTransition { from, to }
    }

    pub fn unavailable(conflicts: Vec<ReservationId>) -> Self {
        ReservationError::Unavailable {
            conflicts,
            blocked_dates: Vec::new(),
        }
    }

    pub fn dates_blocked(blocked_dates: Vec<NaiveDate>) -> Self {
        ReservationError::Unavailable {
            conflicts: Vec::new(),
            blocked_dates,
        }
    }

    pub fn invalid_argument(field: impl Into<String>, message: impl Into<String>) -> Self {
        ReservationError::InvalidArgument {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_modifiable(status: ReservationStatus) -> Self {
        ReservationError::NotModifiable { status }
    }

    pub fn webhook_rejected(reason: impl Into<String>) -> Self {
        ReservationError::WebhookRejected(reason.into())
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        ReservationError::UpstreamFailure(message.into())
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        ReservationError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ReservationError::NotFound(_) => ErrorCode::ReservationNotFound,
            ReservationError::OverrideNotFound { .. } => ErrorCode::NotFound,
            ReservationError::Unauthorized(_) => ErrorCode::Forbidden,
            ReservationError::InvalidTransition { .. } => ErrorCode::InvalidStateTransition,
            ReservationError::Unavailable { .. } => ErrorCode::SubjectUnavailable,
            ReservationError::InvalidArgument { .. } => ErrorCode::ValidationFailed,
            ReservationError::NotModifiable { .. } => ErrorCode::ReservationNotModifiable,
            ReservationError::WebhookRejected(_) => ErrorCode::InvalidWebhookSignature,
            ReservationError::UpstreamFailure(_) => ErrorCode::ExternalServiceError,
            ReservationError::Infrastructure(_) => ErrorCode::InternalError,
        }
    }

    /// Message safe to show to API clients.
    ///
    /// Infrastructure details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            ReservationError::Infrastructure(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<ValidationError> for ReservationError {
    fn from(err: ValidationError) -> Self {
        ReservationError::invalid_argument(err.field().to_string(), err.to_string())
    }
}

impl From<DomainError> for ReservationError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::SubjectUnavailable => ReservationError::unavailable(Vec::new()),
            ErrorCode::ValidationFailed
            | ErrorCode::EmptyField
            | ErrorCode::OutOfRange
            | ErrorCode::InvalidFormat => {
                let field = err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "request".to_string());
                ReservationError::invalid_argument(field, err.message)
            }
            _ => ReservationError::infrastructure(err.to_string()),
        }
    }
}
