//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` port for Stripe integration, including:
//! - Checkout sessions and payment intents for one-off reservation payments
//! - Refunds looked up by reservation metadata
//! - Webhook signature verification
//!
//! # Security
//!
//! - Webhook signatures use HMAC-SHA256 with constant-time comparison
//! - Timestamps are validated to prevent replay attacks (5-minute window)
//! - All secrets are handled via `secrecy::SecretString`

mod api_types;
mod mock_payment_provider;
mod stripe_adapter;

pub use api_types::{StripeCheckoutSession, StripePaymentIntent, StripeRefund};
pub use mock_payment_provider::{MethodCall, MockPaymentProvider};
pub use stripe_adapter::{StripeConfig, StripePaymentAdapter};
