//! Stripe API objects as returned by the REST endpoints we call.
//!
//! Only the fields the booking flow reads are modelled; everything else in
//! the JSON is ignored.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Stripe PaymentIntent object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripePaymentIntent {
    /// Unique intent identifier (pi_...).
    pub id: String,

    /// Secret handed to the browser to complete payment.
    pub client_secret: Option<String>,

    /// Intent status (requires_payment_method, succeeded, ...).
    pub status: String,

    /// Amount in minor units.
    #[serde(default)]
    pub amount: i64,

    #[serde(default)]
    pub currency: String,

    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Stripe Checkout Session object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeCheckoutSession {
    /// Unique session identifier (cs_...).
    pub id: String,

    /// Hosted payment page; absent once the session is complete or expired.
    pub url: Option<String>,

    /// PaymentIntent backing the session, when already created.
    pub payment_intent: Option<String>,

    #[serde(default)]
    pub payment_status: String,

    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Stripe Refund object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeRefund {
    /// Unique refund identifier (re_...).
    pub id: String,

    pub amount: i64,

    pub currency: String,

    /// pending, succeeded, failed, canceled.
    pub status: Option<String>,
}

/// Page returned by the `/search` endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeSearchResult<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,

    #[serde(default)]
    pub has_more: bool,
}

/// Error envelope Stripe returns for non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorBody {
    pub error: StripeApiError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeApiError {
    #[serde(rename = "type", default)]
    pub error_type: String,

    pub code: Option<String>,

    pub decline_code: Option<String>,

    #[serde(default)]
    pub message: String,
}

/// The only envelope field the adapter checks beyond the domain event.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventMode {
    #[serde(default)]
    pub livemode: bool,
}
