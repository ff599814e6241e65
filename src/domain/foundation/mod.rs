//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, and error types
//! that form the vocabulary of the booking domain.

mod currency;
mod date_range;
mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use currency::CurrencyCode;
pub use date_range::DateRange;
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{PaymentId, ReservationId, UserId};
pub use state_machine::StateMachine;
pub use timestamp::{Timestamp, MILLIS_PER_HOUR};
