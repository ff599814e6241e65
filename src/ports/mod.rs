//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! - `ReservationRepository` - reservation persistence and overlap queries
//! - `AvailabilityOverrideRepository` - per-date open/closed overrides
//! - `PaymentRepository` - payment attempt persistence
//! - `PaymentProvider` - payment gateway (checkout, refunds, webhooks)

mod availability_override_repository;
mod payment_provider;
mod payment_repository;
mod reservation_repository;

pub use availability_override_repository::AvailabilityOverrideRepository;
pub use payment_provider::{
    BookingMetadata, CheckoutSession, ConfirmPaymentRequest, CreateCheckoutRequest,
    CreatePaymentIntentRequest, IntentStatus, PaymentConfirmation, PaymentError,
    PaymentErrorCode, PaymentIntent, PaymentProvider, Refund, RefundRequest,
};
pub use payment_repository::PaymentRepository;
pub use reservation_repository::{InsertOutcome, ReservationPage, ReservationRepository};
