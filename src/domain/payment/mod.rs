//! Payment domain module.
//!
//! Payment attempts and the gateway webhook vocabulary: verification,
//! event classification and metadata extraction.

mod aggregate;
mod webhook_errors;
mod webhook_event;
mod webhook_verifier;

pub use aggregate::{Payment, PaymentStatus};
pub use webhook_errors::WebhookError;
pub use webhook_event::{
    PaymentMetadata, WebhookEvent, WebhookEventKind, RESERVATION_ID_KEY, USER_ID_KEY,
};
pub use webhook_verifier::{sign_payload, SignatureHeader, StripeWebhookVerifier};
