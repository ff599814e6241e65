//! Payment configuration

use serde::Deserialize;

use crate::application::handlers::reservation::CheckoutUrls;

use super::error::ValidationError;

/// Payment configuration (Stripe)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Stripe API key
    pub stripe_api_key: String,

    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,

    /// Override for the Stripe API base URL (stripe-mock, proxies)
    pub stripe_api_base: Option<String>,

    /// Reject test-mode events when running against a live key
    #[serde(default)]
    pub require_livemode: bool,

    /// Redirect after a completed checkout; `{reservation_id}` is substituted
    #[serde(default = "default_success_url")]
    pub checkout_success_url: String,

    /// Redirect after an abandoned checkout; `{reservation_id}` is substituted
    #[serde(default = "default_cancel_url")]
    pub checkout_cancel_url: String,
}

impl PaymentConfig {
    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.starts_with("sk_test_")
    }

    /// Check if using Stripe live mode
    pub fn is_live_mode(&self) -> bool {
        self.stripe_api_key.starts_with("sk_live_")
    }

    pub fn checkout_urls(&self) -> CheckoutUrls {
        CheckoutUrls::new(&self.checkout_success_url, &self.checkout_cancel_url)
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.stripe_api_key.is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_API_KEY"));
        }
        if self.stripe_webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_WEBHOOK_SECRET"));
        }

        if !self.stripe_api_key.starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !self.stripe_webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }

        if !is_http_url(&self.checkout_success_url) {
            return Err(ValidationError::InvalidCheckoutUrl("checkout_success_url"));
        }
        if !is_http_url(&self.checkout_cancel_url) {
            return Err(ValidationError::InvalidCheckoutUrl("checkout_cancel_url"));
        }

        Ok(())
    }
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            stripe_api_key: String::new(),
            stripe_webhook_secret: String::new(),
            stripe_api_base: None,
            require_livemode: false,
            checkout_success_url: default_success_url(),
            checkout_cancel_url: default_cancel_url(),
        }
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

fn default_success_url() -> String {
    "http://localhost:3000/reservations/{reservation_id}?payment=success".to_string()
}

fn default_cancel_url() -> String {
    "http://localhost:3000/reservations/{reservation_id}?payment=cancelled".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ReservationId;

    fn valid() -> PaymentConfig {
        PaymentConfig {
            stripe_api_key: "sk_test_abcd1234".to_string(),
            stripe_webhook_secret: "whsec_xyz789".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_mode_detection() {
        let config = valid();
        assert!(config.is_test_mode());
        assert!(!config.is_live_mode());

        let live = PaymentConfig {
            stripe_api_key: "sk_live_xxx".to_string(),
            ..valid()
        };
        assert!(live.is_live_mode());
    }

    #[test]
    fn test_validation_missing_api_key() {
        let config = PaymentConfig::default();
        assert_eq!(
            config.validate(),
            Err(ValidationError::MissingRequired("STRIPE_API_KEY"))
        );
    }

    #[test]
    fn test_validation_invalid_prefixes() {
        let publishable = PaymentConfig {
            stripe_api_key: "pk_test_xxx".to_string(),
            ..valid()
        };
        assert_eq!(publishable.validate(), Err(ValidationError::InvalidStripeKey));

        let bad_secret = PaymentConfig {
            stripe_webhook_secret: "secret_xxx".to_string(),
            ..valid()
        };
        assert_eq!(
            bad_secret.validate(),
            Err(ValidationError::InvalidStripeWebhookSecret)
        );
    }

    #[test]
    fn test_validation_relative_redirect_rejected() {
        let config = PaymentConfig {
            checkout_cancel_url: "/cancelled".to_string(),
            ..valid()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidCheckoutUrl("checkout_cancel_url"))
        );
    }

    #[test]
    fn test_default_checkout_urls_embed_reservation() {
        let id = ReservationId::new();
        let (success, cancel) = valid().checkout_urls().for_reservation(id);
        assert!(success.contains(&id.to_string()));
        assert!(cancel.ends_with("payment=cancelled"));
    }

    #[test]
    fn test_validation_valid_config() {
        assert!(valid().validate().is_ok());
    }
}
