//! Payment provider port for external payment processing.
//!
//! Defines the contract for payment gateway integrations (e.g., Stripe).
//!
//! # Design
//!
//! - **Gateway agnostic**: booking references travel as metadata
//! - **One-off payments**: each reservation is paid through a checkout
//!   session or a payment intent
//! - **Verified webhooks**: events only reach the domain after signature checks

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::foundation::{CurrencyCode, ReservationId, UserId};
use crate::domain::payment::{WebhookEvent, RESERVATION_ID_KEY, USER_ID_KEY};
use crate::domain::reservation::ReservationError;

/// Port for payment provider integrations.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Create a payment intent and return its client secret.
    async fn create_payment_intent(
        &self,
        request: CreatePaymentIntentRequest,
    ) -> Result<PaymentIntent, PaymentError>;

    /// Create a hosted checkout session for a one-off payment.
    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError>;

    /// Verify a webhook signature and parse the event.
    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookEvent, PaymentError>;

    /// Refund the successful payment made for a reservation.
    ///
    /// `amount` of `None` refunds the full charge.
    async fn process_refund(&self, request: RefundRequest) -> Result<Refund, PaymentError>;

    /// Confirm the reservation's outstanding payment intent with a payment method.
    async fn confirm_payment(
        &self,
        request: ConfirmPaymentRequest,
    ) -> Result<PaymentConfirmation, PaymentError>;
}

/// Booking references attached to every gateway object we create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingMetadata {
    pub reservation_id: ReservationId,
    pub user_id: UserId,
}

impl BookingMetadata {
    /// Key/value pairs in the gateway's metadata naming.
    pub fn as_pairs(&self) -> [(&'static str, String); 2] {
        [
            (RESERVATION_ID_KEY, self.reservation_id.to_string()),
            (USER_ID_KEY, self.user_id.to_string()),
        ]
    }
}

/// Request to create a payment intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaymentIntentRequest {
    /// Minor units.
    pub amount: i64,
    pub currency: CurrencyCode,
    pub metadata: BookingMetadata,
}

/// Payment intent as created by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
    pub status: IntentStatus,
}

/// Request to create a checkout session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCheckoutRequest {
    /// Minor units.
    pub amount: i64,
    pub currency: CurrencyCode,
    /// Line item label shown on the hosted page.
    pub description: String,
    pub metadata: BookingMetadata,
    pub success_url: String,
    pub cancel_url: String,
}

/// Checkout session for payment completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Provider's session ID.
    pub id: String,
    /// URL for the guest to complete payment.
    pub url: String,
    pub payment_intent_id: Option<String>,
}

/// Request to refund a reservation's payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundRequest {
    pub reservation_id: ReservationId,
    /// Minor units; full refund when absent.
    pub amount: Option<i64>,
    /// Currency of the charge being refunded.
    pub currency: CurrencyCode,
    pub reason: Option<String>,
}

/// Refund as recorded by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refund {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

/// Request to confirm an outstanding payment intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmPaymentRequest {
    pub reservation_id: ReservationId,
    pub payment_method_id: String,
}

/// Result of confirming a payment intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub id: String,
    pub status: IntentStatus,
}

/// Payment intent status from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    Succeeded,
    Canceled,
    Unknown,
}

impl IntentStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "requires_payment_method" => IntentStatus::RequiresPaymentMethod,
            "requires_confirmation" => IntentStatus::RequiresConfirmation,
            "requires_action" => IntentStatus::RequiresAction,
            "processing" => IntentStatus::Processing,
            "succeeded" => IntentStatus::Succeeded,
            "canceled" => IntentStatus::Canceled,
            _ => IntentStatus::Unknown,
        }
    }
}

/// Failure reported by a payment gateway call.
///
/// `retryable` is derived from the kind: transport failures and rate limits
/// may succeed on a later attempt, rejections will not.
#[derive(Debug, Clone, Error)]
#[error("{code}: {message}")]
pub struct PaymentError {
    pub code: PaymentErrorCode,
    pub message: String,
    /// Gateway's own decline or error code, when it sent one.
    pub provider_code: Option<String>,
    pub retryable: bool,
}

impl PaymentError {
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    pub fn with_provider_code(self, provider_code: impl Into<String>) -> Self {
        Self {
            provider_code: Some(provider_code.into()),
            ..self
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProviderError, message)
    }

    pub fn not_found(what: &str) -> Self {
        Self::new(PaymentErrorCode::NotFound, format!("{what} not found"))
    }

    pub fn invalid_webhook(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::InvalidWebhook, message)
    }
}

impl From<PaymentError> for ReservationError {
    fn from(err: PaymentError) -> Self {
        match err.code {
            PaymentErrorCode::InvalidWebhook => ReservationError::webhook_rejected(err.message),
            _ => ReservationError::upstream(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    #[error("network_error")]
    NetworkError,
    #[error("authentication_error")]
    AuthenticationError,
    #[error("card_declined")]
    CardDeclined,
    #[error("insufficient_funds")]
    InsufficientFunds,
    #[error("not_found")]
    NotFound,
    #[error("rate_limit_exceeded")]
    RateLimitExceeded,
    /// Bad signature, stale timestamp or unparseable event body.
    #[error("invalid_webhook")]
    InvalidWebhook,
    #[error("provider_error")]
    ProviderError,
}

impl PaymentErrorCode {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkError | Self::RateLimitExceeded)
    }
}
