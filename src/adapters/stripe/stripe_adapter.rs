//! Stripe payment provider adapter.
//!
//! Implements the `PaymentProvider` trait against the Stripe REST API.
//! Reservations are paid one-off, through hosted checkout sessions or
//! payment intents that carry the booking references as metadata.
//!
//! # Security
//!
//! - Webhook signatures are checked by `StripeWebhookVerifier`
//! - Secrets handled via `secrecy::SecretString`
//!
//! # Configuration
//!
//! ```ignore
//! let config = StripeConfig::new(api_key, webhook_secret);
//! let adapter = StripePaymentAdapter::new(config);
//! ```

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use crate::domain::foundation::ReservationId;
use crate::domain::payment::{StripeWebhookVerifier, WebhookError, WebhookEvent, RESERVATION_ID_KEY};
use crate::ports::{
    BookingMetadata, CheckoutSession, ConfirmPaymentRequest, CreateCheckoutRequest,
    CreatePaymentIntentRequest, IntentStatus, PaymentConfirmation, PaymentError,
    PaymentErrorCode, PaymentIntent, PaymentProvider, Refund, RefundRequest,
};

use super::api_types::{
    StripeCheckoutSession, StripeErrorBody, StripeEventMode, StripePaymentIntent, StripeRefund,
    StripeSearchResult,
};

const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Webhook signing secret (whsec_...).
    webhook_secret: SecretString,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,

    /// Whether to require livemode events in production.
    require_livemode: bool,
}

impl StripeConfig {
    /// Create a new Stripe configuration.
    pub fn new(api_key: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            webhook_secret: SecretString::new(webhook_secret.into()),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            require_livemode: false,
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Require livemode events in production.
    pub fn with_require_livemode(mut self, require: bool) -> Self {
        self.require_livemode = require;
        self
    }
}

/// Stripe payment provider adapter.
pub struct StripePaymentAdapter {
    config: StripeConfig,
    verifier: StripeWebhookVerifier,
    http_client: reqwest::Client,
}

impl StripePaymentAdapter {
    /// Create a new Stripe adapter with the given configuration.
    pub fn new(config: StripeConfig) -> Self {
        let verifier = StripeWebhookVerifier::new(config.webhook_secret.expose_secret().as_bytes());
        Self {
            config,
            verifier,
            http_client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    /// Sends an authenticated request and decodes the JSON body.
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        operation: &'static str,
    ) -> Result<T, PaymentError> {
        let response = request
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = error_from_response(status, &body);
            tracing::error!(
                operation,
                status = status.as_u16(),
                code = %error.code,
                error = %error.message,
                "Stripe request failed"
            );
            return Err(error);
        }

        response.json().await.map_err(|e| {
            PaymentError::provider(format!("Failed to parse Stripe response: {}", e))
        })
    }

    /// Payment intents created for `reservation_id`, optionally filtered by status.
    async fn search_intents(
        &self,
        reservation_id: &ReservationId,
        status: Option<&str>,
    ) -> Result<Vec<StripePaymentIntent>, PaymentError> {
        let query = intent_search_query(reservation_id, status);
        let request = self
            .http_client
            .get(self.url("/v1/payment_intents/search"))
            .query(&[("query", query)]);

        let page: StripeSearchResult<StripePaymentIntent> =
            self.send(request, "search_payment_intents").await?;
        Ok(page.data)
    }
}

/// Stripe search query matching intents tagged with `reservation_id`.
fn intent_search_query(reservation_id: &ReservationId, status: Option<&str>) -> String {
    let mut query = format!("metadata['{}']:'{}'", RESERVATION_ID_KEY, reservation_id);
    if let Some(status) = status {
        query.push_str(&format!(" AND status:'{}'", status));
    }
    query
}

fn metadata_params(prefix: &str, metadata: &BookingMetadata) -> Vec<(String, String)> {
    metadata
        .as_pairs()
        .into_iter()
        .map(|(key, value)| (format!("{}[{}]", prefix, key), value))
        .collect()
}

fn checkout_params(request: &CreateCheckoutRequest) -> Vec<(String, String)> {
    let mut params = vec![
        ("mode".to_string(), "payment".to_string()),
        (
            "line_items[0][price_data][currency]".to_string(),
            request.currency.to_string(),
        ),
        (
            "line_items[0][price_data][unit_amount]".to_string(),
            request.amount.to_string(),
        ),
        (
            "line_items[0][price_data][product_data][name]".to_string(),
            request.description.clone(),
        ),
        ("line_items[0][quantity]".to_string(), "1".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
    ];
    params.extend(metadata_params("metadata", &request.metadata));
    // payment_intent.* events only see the intent's own metadata
    params.extend(metadata_params(
        "payment_intent_data[metadata]",
        &request.metadata,
    ));
    params
}

fn refund_params(payment_intent_id: &str, request: &RefundRequest) -> Vec<(String, String)> {
    let mut params = vec![
        ("payment_intent".to_string(), payment_intent_id.to_string()),
        ("reason".to_string(), "requested_by_customer".to_string()),
        (
            format!("metadata[{}]", RESERVATION_ID_KEY),
            request.reservation_id.to_string(),
        ),
    ];
    if let Some(amount) = request.amount {
        params.push(("amount".to_string(), amount.to_string()));
    }
    if let Some(reason) = &request.reason {
        params.push(("metadata[reason]".to_string(), reason.clone()));
    }
    params
}

/// Stripe refunds in the charge's currency; a mismatch means the caller
/// picked the wrong payment.
fn check_refund_currency(
    intent: &StripePaymentIntent,
    request: &RefundRequest,
) -> Result<(), PaymentError> {
    if intent.currency.is_empty() || intent.currency.eq_ignore_ascii_case(request.currency.as_str()) {
        return Ok(());
    }
    Err(PaymentError::new(
        PaymentErrorCode::ProviderError,
        format!(
            "refund currency {} does not match charge currency {}",
            request.currency, intent.currency
        ),
    ))
}

fn error_from_response(status: StatusCode, body: &str) -> PaymentError {
    let parsed = serde_json::from_str::<StripeErrorBody>(body).ok();
    let message = parsed
        .as_ref()
        .map(|b| b.error.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("Stripe API error: {}", body));

    let code = match status {
        StatusCode::UNAUTHORIZED => PaymentErrorCode::AuthenticationError,
        StatusCode::PAYMENT_REQUIRED => {
            let declined_for_funds = parsed
                .as_ref()
                .and_then(|b| b.error.decline_code.as_deref())
                == Some("insufficient_funds");
            if declined_for_funds {
                PaymentErrorCode::InsufficientFunds
            } else {
                PaymentErrorCode::CardDeclined
            }
        }
        StatusCode::NOT_FOUND => PaymentErrorCode::NotFound,
        StatusCode::TOO_MANY_REQUESTS => PaymentErrorCode::RateLimitExceeded,
        s if s.is_server_error() => PaymentErrorCode::NetworkError,
        _ => PaymentErrorCode::ProviderError,
    };

    let error = PaymentError::new(code, message);
    match parsed.and_then(|b| b.error.code) {
        Some(provider_code) => error.with_provider_code(provider_code),
        None => error,
    }
}

fn webhook_error(err: WebhookError) -> PaymentError {
    tracing::warn!(error = %err, "Webhook verification failed");
    PaymentError::invalid_webhook(err.to_string())
}

#[async_trait]
impl PaymentProvider for StripePaymentAdapter {
    async fn create_payment_intent(
        &self,
        request: CreatePaymentIntentRequest,
    ) -> Result<PaymentIntent, PaymentError> {
        let mut params = vec![
            ("amount".to_string(), request.amount.to_string()),
            ("currency".to_string(), request.currency.to_string()),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
        ];
        params.extend(metadata_params("metadata", &request.metadata));

        let intent: StripePaymentIntent = self
            .send(
                self.http_client
                    .post(self.url("/v1/payment_intents"))
                    .form(&params),
                "create_payment_intent",
            )
            .await?;

        tracing::info!(
            payment_intent_id = %intent.id,
            reservation_id = %request.metadata.reservation_id,
            "Created payment intent"
        );

        Ok(PaymentIntent {
            client_secret: intent.client_secret.unwrap_or_default(),
            status: IntentStatus::parse(&intent.status),
            id: intent.id,
        })
    }

    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let params = checkout_params(&request);

        let session: StripeCheckoutSession = self
            .send(
                self.http_client
                    .post(self.url("/v1/checkout/sessions"))
                    .form(&params),
                "create_checkout_session",
            )
            .await?;

        let url = session
            .url
            .ok_or_else(|| PaymentError::provider("Checkout session has no payment URL"))?;

        tracing::info!(
            session_id = %session.id,
            reservation_id = %request.metadata.reservation_id,
            amount = request.amount,
            "Created checkout session"
        );

        Ok(CheckoutSession {
            id: session.id,
            url,
            payment_intent_id: session.payment_intent,
        })
    }

    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookEvent, PaymentError> {
        let event = self
            .verifier
            .verify_and_parse(payload, signature)
            .map_err(webhook_error)?;

        if self.config.require_livemode {
            let mode: StripeEventMode = serde_json::from_slice(payload)
                .map_err(|e| PaymentError::invalid_webhook(format!("Invalid JSON: {}", e)))?;
            if !mode.livemode {
                tracing::warn!(event_id = %event.id, "Rejected test mode event in production");
                return Err(PaymentError::invalid_webhook(
                    "Test mode events not allowed in production",
                ));
            }
        }

        tracing::info!(
            event_id = %event.id,
            event_type = event.kind.as_str(),
            "Webhook signature verified"
        );

        Ok(event)
    }

    async fn process_refund(&self, request: RefundRequest) -> Result<Refund, PaymentError> {
        let intent = self
            .search_intents(&request.reservation_id, Some("succeeded"))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PaymentError::not_found("Successful payment for reservation"))?;
        check_refund_currency(&intent, &request)?;

        let params = refund_params(&intent.id, &request);
        let refund: StripeRefund = self
            .send(
                self.http_client.post(self.url("/v1/refunds")).form(&params),
                "create_refund",
            )
            .await?;

        tracing::info!(
            refund_id = %refund.id,
            reservation_id = %request.reservation_id,
            amount = refund.amount,
            "Refund created"
        );

        Ok(Refund {
            id: refund.id,
            amount: refund.amount,
            currency: refund.currency,
            status: refund.status.unwrap_or_else(|| "pending".to_string()),
        })
    }

    async fn confirm_payment(
        &self,
        request: ConfirmPaymentRequest,
    ) -> Result<PaymentConfirmation, PaymentError> {
        let intent = self
            .search_intents(&request.reservation_id, None)
            .await?
            .into_iter()
            .find(|i| {
                !matches!(
                    IntentStatus::parse(&i.status),
                    IntentStatus::Succeeded | IntentStatus::Canceled
                )
            })
            .ok_or_else(|| PaymentError::not_found("Open payment intent for reservation"))?;

        let confirmed: StripePaymentIntent = self
            .send(
                self.http_client
                    .post(self.url(&format!("/v1/payment_intents/{}/confirm", intent.id)))
                    .form(&[("payment_method", request.payment_method_id.as_str())]),
                "confirm_payment_intent",
            )
            .await?;

        tracing::info!(
            payment_intent_id = %confirmed.id,
            reservation_id = %request.reservation_id,
            status = %confirmed.status,
            "Payment intent confirmed"
        );

        Ok(PaymentConfirmation {
            status: IntentStatus::parse(&confirmed.status),
            id: confirmed.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{CurrencyCode, UserId};
    use crate::domain::payment::{sign_payload, WebhookEventKind};

    const SECRET: &str = "whsec_test_secret";

    fn test_config() -> StripeConfig {
        StripeConfig::new("sk_test_key", SECRET)
    }

    fn metadata() -> BookingMetadata {
        BookingMetadata {
            reservation_id: ReservationId::new(),
            user_id: UserId::new("guest-7").unwrap(),
        }
    }

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn config_new_sets_defaults() {
        let config = test_config();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert!(!config.require_livemode);
    }

    #[test]
    fn config_with_base_url() {
        let config = test_config().with_base_url("http://localhost:12111");
        assert_eq!(config.api_base_url, "http://localhost:12111");
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Request Building Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn checkout_params_tag_session_and_intent() {
        let metadata = metadata();
        let request = CreateCheckoutRequest {
            amount: 7500,
            currency: CurrencyCode::new("eur").unwrap(),
            description: "Room 101".to_string(),
            metadata: metadata.clone(),
            success_url: "https://example.test/ok".to_string(),
            cancel_url: "https://example.test/cancel".to_string(),
        };

        let params = checkout_params(&request);

        assert_eq!(param(&params, "mode"), Some("payment"));
        assert_eq!(
            param(&params, "line_items[0][price_data][unit_amount]"),
            Some("7500")
        );
        let reservation_id = metadata.reservation_id.to_string();
        assert_eq!(
            param(&params, "metadata[reservationId]"),
            Some(reservation_id.as_str())
        );
        assert_eq!(
            param(&params, "payment_intent_data[metadata][reservationId]"),
            Some(reservation_id.as_str())
        );
        assert_eq!(param(&params, "metadata[userId]"), Some("guest-7"));
    }

    #[test]
    fn refund_params_full_refund_omits_amount() {
        let request = RefundRequest {
            reservation_id: ReservationId::new(),
            amount: None,
            currency: CurrencyCode::new("eur").unwrap(),
            reason: Some("guest cancelled".to_string()),
        };

        let params = refund_params("pi_1", &request);

        assert_eq!(param(&params, "payment_intent"), Some("pi_1"));
        assert_eq!(param(&params, "amount"), None);
        assert_eq!(param(&params, "metadata[reason]"), Some("guest cancelled"));
    }

    #[test]
    fn refund_params_partial_refund_sets_amount() {
        let request = RefundRequest {
            reservation_id: ReservationId::new(),
            amount: Some(1250),
            currency: CurrencyCode::new("eur").unwrap(),
            reason: None,
        };

        let params = refund_params("pi_1", &request);

        assert_eq!(param(&params, "amount"), Some("1250"));
    }

    #[test]
    fn refund_currency_must_match_the_charge() {
        let intent: StripePaymentIntent = serde_json::from_value(serde_json::json!({
            "id": "pi_1",
            "status": "succeeded",
            "amount": 5000,
            "currency": "eur"
        }))
        .unwrap();
        let mut request = RefundRequest {
            reservation_id: ReservationId::new(),
            amount: None,
            currency: CurrencyCode::new("EUR").unwrap(),
            reason: None,
        };

        assert!(check_refund_currency(&intent, &request).is_ok());

        request.currency = CurrencyCode::new("usd").unwrap();
        let err = check_refund_currency(&intent, &request).unwrap_err();
        assert_eq!(err.code, PaymentErrorCode::ProviderError);
        assert!(!err.retryable);
    }

    #[test]
    fn search_query_filters_by_reservation_and_status() {
        let id = ReservationId::new();
        let query = intent_search_query(&id, Some("succeeded"));
        assert_eq!(
            query,
            format!("metadata['reservationId']:'{}' AND status:'succeeded'", id)
        );
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Error Mapping Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn maps_card_errors() {
        let body = r#"{"error":{"type":"card_error","code":"card_declined","decline_code":"insufficient_funds","message":"Insufficient funds"}}"#;

        let err = error_from_response(StatusCode::PAYMENT_REQUIRED, body);

        assert_eq!(err.code, PaymentErrorCode::InsufficientFunds);
        assert_eq!(err.message, "Insufficient funds");
        assert_eq!(err.provider_code.as_deref(), Some("card_declined"));
    }

    #[test]
    fn maps_rate_limit_as_retryable() {
        let err = error_from_response(StatusCode::TOO_MANY_REQUESTS, "");
        assert_eq!(err.code, PaymentErrorCode::RateLimitExceeded);
        assert!(err.retryable);
    }

    #[test]
    fn unparseable_error_body_is_kept_in_message() {
        let err = error_from_response(StatusCode::BAD_REQUEST, "<html>oops</html>");
        assert_eq!(err.code, PaymentErrorCode::ProviderError);
        assert!(err.message.contains("oops"));
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Webhook Tests
    // ════════════════════════════════════════════════════════════════════════════

    fn event_payload(livemode: bool) -> String {
        serde_json::json!({
            "id": "evt_test123",
            "type": "payment_intent.succeeded",
            "created": 1704067200,
            "data": {"object": {"id": "pi_1", "metadata": {}}},
            "livemode": livemode
        })
        .to_string()
    }

    #[tokio::test]
    async fn verify_webhook_valid_signature_and_payload() {
        let adapter = StripePaymentAdapter::new(test_config());
        let payload = event_payload(false);
        let signature = sign_payload(SECRET, chrono::Utc::now().timestamp(), payload.as_bytes());

        let event = adapter
            .verify_webhook(payload.as_bytes(), &signature)
            .await
            .unwrap();

        assert_eq!(event.id, "evt_test123");
        assert_eq!(event.kind, WebhookEventKind::PaymentIntentSucceeded);
    }

    #[tokio::test]
    async fn verify_webhook_rejects_wrong_secret() {
        let adapter = StripePaymentAdapter::new(test_config());
        let payload = event_payload(false);
        let signature = sign_payload(
            "whsec_other",
            chrono::Utc::now().timestamp(),
            payload.as_bytes(),
        );

        let err = adapter
            .verify_webhook(payload.as_bytes(), &signature)
            .await
            .unwrap_err();

        assert_eq!(err.code, PaymentErrorCode::InvalidWebhook);
    }

    #[tokio::test]
    async fn verify_webhook_rejects_malformed_header() {
        let adapter = StripePaymentAdapter::new(test_config());
        let result = adapter
            .verify_webhook(event_payload(false).as_bytes(), "malformed_header")
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn verify_webhook_rejects_test_mode_in_production() {
        let adapter = StripePaymentAdapter::new(test_config().with_require_livemode(true));
        let payload = event_payload(false);
        let signature = sign_payload(SECRET, chrono::Utc::now().timestamp(), payload.as_bytes());

        let err = adapter
            .verify_webhook(payload.as_bytes(), &signature)
            .await
            .unwrap_err();

        assert!(err.message.contains("Test mode"));
    }

    #[tokio::test]
    async fn verify_webhook_accepts_live_events_in_production() {
        let adapter = StripePaymentAdapter::new(test_config().with_require_livemode(true));
        let payload = event_payload(true);
        let signature = sign_payload(SECRET, chrono::Utc::now().timestamp(), payload.as_bytes());

        assert!(adapter
            .verify_webhook(payload.as_bytes(), &signature)
            .await
            .is_ok());
    }
}
