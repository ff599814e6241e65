//! Gateway webhook events and their mapping onto payment outcomes.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ReservationId, UserId};

use super::{PaymentStatus, WebhookError};

/// Metadata key carrying the reservation id on gateway objects.
pub const RESERVATION_ID_KEY: &str = "reservationId";

/// Metadata key carrying the owning user id on gateway objects.
pub const USER_ID_KEY: &str = "userId";

/// Event types the reconciliation flow distinguishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WebhookEventKind {
    PaymentIntentSucceeded,
    PaymentIntentPaymentFailed,
    PaymentIntentCanceled,
    PaymentIntentCreated,
    PaymentIntentProcessing,
    PaymentIntentRequiresAction,
    CheckoutSessionCompleted,
    CheckoutSessionExpired,
    PaymentMethodAttached,
    SetupIntentCreated,
    /// Anything else; acknowledged and logged.
    Other(String),
}

impl WebhookEventKind {
    pub fn parse(event_type: &str) -> Self {
        match event_type {
            "payment_intent.succeeded" => Self::PaymentIntentSucceeded,
            "payment_intent.payment_failed" => Self::PaymentIntentPaymentFailed,
            "payment_intent.canceled" => Self::PaymentIntentCanceled,
            "payment_intent.created" => Self::PaymentIntentCreated,
            "payment_intent.processing" => Self::PaymentIntentProcessing,
            "payment_intent.requires_action" => Self::PaymentIntentRequiresAction,
            "checkout.session.completed" => Self::CheckoutSessionCompleted,
            "checkout.session.expired" => Self::CheckoutSessionExpired,
            "payment_method.attached" => Self::PaymentMethodAttached,
            "setup_intent.created" => Self::SetupIntentCreated,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::PaymentIntentSucceeded => "payment_intent.succeeded",
            Self::PaymentIntentPaymentFailed => "payment_intent.payment_failed",
            Self::PaymentIntentCanceled => "payment_intent.canceled",
            Self::PaymentIntentCreated => "payment_intent.created",
            Self::PaymentIntentProcessing => "payment_intent.processing",
            Self::PaymentIntentRequiresAction => "payment_intent.requires_action",
            Self::CheckoutSessionCompleted => "checkout.session.completed",
            Self::CheckoutSessionExpired => "checkout.session.expired",
            Self::PaymentMethodAttached => "payment_method.attached",
            Self::SetupIntentCreated => "setup_intent.created",
            Self::Other(s) => s,
        }
    }

    /// Intermediate events that never carry booking metadata.
    pub fn carries_metadata(&self) -> bool {
        !matches!(
            self,
            Self::PaymentIntentCreated
                | Self::PaymentIntentProcessing
                | Self::PaymentIntentRequiresAction
                | Self::PaymentMethodAttached
                | Self::SetupIntentCreated
        )
    }

    pub fn is_handled(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

/// A verified webhook delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    pub kind: WebhookEventKind,
    /// Unix seconds.
    pub created: i64,
    /// The gateway object the event is about (payment intent, checkout session).
    pub object: serde_json::Value,
}

#[derive(Deserialize)]
struct Envelope {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    created: i64,
    data: EnvelopeData,
}

#[derive(Deserialize)]
struct EnvelopeData {
    object: serde_json::Value,
}

impl WebhookEvent {
    /// Decodes a raw Stripe event body.
    pub fn from_payload(payload: &[u8]) -> Result<Self, WebhookError> {
        let envelope: Envelope = serde_json::from_slice(payload)
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        Ok(Self {
            id: envelope.id,
            kind: WebhookEventKind::parse(&envelope.event_type),
            created: envelope.created,
            object: envelope.data.object,
        })
    }

    /// Payment status implied by this event.
    pub fn classify(&self) -> PaymentStatus {
        match self.kind {
            WebhookEventKind::PaymentIntentSucceeded => PaymentStatus::Paid,
            WebhookEventKind::PaymentIntentPaymentFailed
            | WebhookEventKind::PaymentIntentCanceled
            | WebhookEventKind::CheckoutSessionExpired => PaymentStatus::Failed,
            WebhookEventKind::CheckoutSessionCompleted => {
                if self.object.get("payment_status").and_then(|v| v.as_str()) == Some("paid") {
                    PaymentStatus::Paid
                } else {
                    PaymentStatus::Pending
                }
            }
            _ => PaymentStatus::Pending,
        }
    }

    /// Reads the booking references attached when the checkout was created.
    pub fn metadata(&self) -> Result<PaymentMetadata, WebhookError> {
        let metadata = self.object.get("metadata");

        let reservation_id = metadata_str(metadata, RESERVATION_ID_KEY, "reservation_id")
            .and_then(|s| s.parse::<ReservationId>().ok())
            .ok_or(WebhookError::MissingMetadata(RESERVATION_ID_KEY))?;
        let user_id = metadata_str(metadata, USER_ID_KEY, "user_id")
            .and_then(|s| UserId::new(s).ok())
            .ok_or(WebhookError::MissingMetadata(USER_ID_KEY))?;

        Ok(PaymentMetadata {
            reservation_id,
            user_id,
        })
    }
}

fn metadata_str<'a>(
    metadata: Option<&'a serde_json::Value>,
    key: &str,
    fallback_key: &str,
) -> Option<&'a str> {
    let metadata = metadata?;
    metadata
        .get(key)
        .or_else(|| metadata.get(fallback_key))
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Booking references recovered from a gateway object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentMetadata {
    pub reservation_id: ReservationId,
    pub user_id: UserId,
}
