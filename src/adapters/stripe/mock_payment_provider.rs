//! Mock payment provider for testing.
//!
//! Provides a configurable mock implementation of `PaymentProvider` for unit
//! and integration tests. Supports:
//! - Pre-configured responses
//! - Error injection
//! - Call tracking
//! - Webhook verification with a real signing secret

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::payment::{StripeWebhookVerifier, WebhookEvent};
use crate::ports::{
    CheckoutSession, ConfirmPaymentRequest, CreateCheckoutRequest, CreatePaymentIntentRequest,
    IntentStatus, PaymentConfirmation, PaymentError, PaymentIntent, PaymentProvider, Refund,
    RefundRequest,
};

/// Mock payment provider for testing.
///
/// # Example
///
/// ```ignore
/// let mock = MockPaymentProvider::new();
///
/// // Inject errors
/// mock.set_method_error("create_checkout_session", PaymentError::network("down"));
///
/// // Use in tests
/// let result = mock.create_checkout_session(request).await;
/// assert!(mock.was_called("create_checkout_session"));
/// ```
#[derive(Default)]
pub struct MockPaymentProvider {
    /// Inner state (thread-safe for async tests).
    inner: Arc<Mutex<MockState>>,
}

/// Internal mutable state.
#[derive(Default)]
struct MockState {
    next_checkout: Option<CheckoutSession>,
    next_intent: Option<PaymentIntent>,
    next_confirmation: Option<PaymentConfirmation>,
    next_webhook_event: Option<WebhookEvent>,

    /// Error to return on next call.
    next_error: Option<PaymentError>,

    /// Specific errors by method name.
    method_errors: HashMap<String, PaymentError>,

    /// Track method calls for assertions.
    call_log: Vec<MethodCall>,

    /// Refunds issued, in order.
    refunds: Vec<RefundRequest>,

    webhook_verify_mode: WebhookVerifyMode,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

/// How to handle webhook verification.
#[derive(Default, Clone)]
enum WebhookVerifyMode {
    /// Accept any payload; decode it unless an event was configured.
    #[default]
    AcceptAll,

    /// Check signatures against this secret, as the real adapter does.
    RequireSignature(String),

    /// Always fail verification.
    AlwaysFail,
}

fn mock_id(prefix: &str) -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_mock_{}", prefix, &uuid[..8])
}

impl MockPaymentProvider {
    /// Create a new mock provider with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that fails all webhook verifications.
    pub fn rejecting_webhooks() -> Self {
        let mock = Self::new();
        mock.state().webhook_verify_mode = WebhookVerifyMode::AlwaysFail;
        mock
    }

    /// Create a mock that verifies webhook signatures with `secret`.
    pub fn with_webhook_secret(secret: impl Into<String>) -> Self {
        let mock = Self::new();
        mock.state().webhook_verify_mode = WebhookVerifyMode::RequireSignature(secret.into());
        mock
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Set the checkout session to return.
    pub fn set_checkout_session(&self, session: CheckoutSession) {
        self.state().next_checkout = Some(session);
    }

    /// Set the payment intent to return.
    pub fn set_payment_intent(&self, intent: PaymentIntent) {
        self.state().next_intent = Some(intent);
    }

    /// Set the confirmation to return.
    pub fn set_confirmation(&self, confirmation: PaymentConfirmation) {
        self.state().next_confirmation = Some(confirmation);
    }

    /// Set the webhook event to return on verification.
    pub fn set_webhook_event(&self, event: WebhookEvent) {
        self.state().next_webhook_event = Some(event);
    }

    /// Set an error to return on the next call to any method.
    pub fn set_error(&self, error: PaymentError) {
        self.state().next_error = Some(error);
    }

    /// Set an error for a specific method.
    pub fn set_method_error(&self, method: &str, error: PaymentError) {
        self.state().method_errors.insert(method.to_string(), error);
    }

    /// Clear all configured errors.
    pub fn clear_errors(&self) {
        let mut state = self.state();
        state.next_error = None;
        state.method_errors.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    /// Get all recorded method calls.
    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    /// Check if a method was called.
    pub fn was_called(&self, method: &str) -> bool {
        self.state().call_log.iter().any(|c| c.method == method)
    }

    /// Get count of calls to a method.
    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    /// Refund requests received so far.
    pub fn refunds(&self) -> Vec<RefundRequest> {
        self.state().refunds.clone()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Internal Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn record_call(&self, method: &str, args: Vec<String>) {
        self.state().call_log.push(MethodCall {
            method: method.to_string(),
            args,
        });
    }

    fn check_error(&self, method: &str) -> Result<(), PaymentError> {
        let mut state = self.state();

        if let Some(error) = state.method_errors.get(method) {
            return Err(error.clone());
        }

        if let Some(error) = state.next_error.take() {
            return Err(error);
        }

        Ok(())
    }
}

impl Clone for MockPaymentProvider {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_payment_intent(
        &self,
        request: CreatePaymentIntentRequest,
    ) -> Result<PaymentIntent, PaymentError> {
        self.record_call(
            "create_payment_intent",
            vec![
                request.metadata.reservation_id.to_string(),
                request.amount.to_string(),
            ],
        );
        self.check_error("create_payment_intent")?;

        let intent = self.state().next_intent.take().unwrap_or_else(|| {
            let id = mock_id("pi");
            PaymentIntent {
                client_secret: format!("{}_secret", id),
                id,
                status: IntentStatus::RequiresPaymentMethod,
            }
        });
        Ok(intent)
    }

    async fn create_checkout_session(
        &self,
        request: CreateCheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        self.record_call(
            "create_checkout_session",
            vec![
                request.metadata.reservation_id.to_string(),
                request.metadata.user_id.to_string(),
                request.amount.to_string(),
                request.currency.to_string(),
            ],
        );
        self.check_error("create_checkout_session")?;

        let session = self.state().next_checkout.take().unwrap_or_else(|| {
            let id = mock_id("cs");
            CheckoutSession {
                url: format!("https://checkout.stripe.com/c/pay/{}", id),
                id,
                payment_intent_id: None,
            }
        });
        Ok(session)
    }

    async fn verify_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookEvent, PaymentError> {
        self.record_call("verify_webhook", vec![signature.to_string()]);
        self.check_error("verify_webhook")?;

        let (mode, configured) = {
            let mut state = self.state();
            (
                state.webhook_verify_mode.clone(),
                state.next_webhook_event.take(),
            )
        };

        match mode {
            WebhookVerifyMode::AlwaysFail => {
                Err(PaymentError::invalid_webhook("Mock: verification disabled"))
            }
            WebhookVerifyMode::RequireSignature(secret) => StripeWebhookVerifier::new(secret)
                .verify_and_parse(payload, signature)
                .map_err(|e| PaymentError::invalid_webhook(e.to_string())),
            WebhookVerifyMode::AcceptAll => match configured {
                Some(event) => Ok(event),
                None => WebhookEvent::from_payload(payload)
                    .map_err(|e| PaymentError::invalid_webhook(e.to_string())),
            },
        }
    }

    async fn process_refund(&self, request: RefundRequest) -> Result<Refund, PaymentError> {
        self.record_call(
            "process_refund",
            vec![
                request.reservation_id.to_string(),
                request.amount.map(|a| a.to_string()).unwrap_or_default(),
            ],
        );
        self.check_error("process_refund")?;

        let refund = Refund {
            id: mock_id("re"),
            amount: request.amount.unwrap_or_default(),
            currency: request.currency.as_str().to_string(),
            status: "succeeded".to_string(),
        };
        self.state().refunds.push(request);
        Ok(refund)
    }

    async fn confirm_payment(
        &self,
        request: ConfirmPaymentRequest,
    ) -> Result<PaymentConfirmation, PaymentError> {
        self.record_call(
            "confirm_payment",
            vec![
                request.reservation_id.to_string(),
                request.payment_method_id.clone(),
            ],
        );
        self.check_error("confirm_payment")?;

        let confirmation = self
            .state()
            .next_confirmation
            .take()
            .unwrap_or_else(|| PaymentConfirmation {
                id: mock_id("pi"),
                status: IntentStatus::Succeeded,
            });
        Ok(confirmation)
    }
}
