//! Stripe API client implementation.
//!
//! A thin form-encoded client over reqwest covering the subset of the API
//! this service uses: subscription-mode checkout sessions, subscription
//! retrieval/listing/cancellation, and webhook signature verification.

use std::time::Duration;

use reqwest::Client;

use crate::crypto::{constant_time_eq, hmac_sha256_hex};

use super::types::{CheckoutSession, StripeErrorResponse, StripeList, Subscription};

/// Default Stripe API base URL.
const DEFAULT_BASE_URL: &str = "https://api.stripe.com/v1";

/// Error type for Stripe operations.
#[derive(Debug, thiserror::Error)]
pub enum StripeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Stripe API returned an error.
    #[error("Stripe API error: {error_type} - {message}")]
    Api {
        /// Error type.
        error_type: String,
        /// Error message.
        message: String,
        /// Error code.
        code: Option<String>,
    },

    /// Invalid webhook signature.
    #[error("invalid webhook signature")]
    InvalidSignature,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Stripe API client.
#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    base_url: String,
    api_key: String,
    webhook_secret: Option<String>,
}

impl StripeClient {
    /// Create a new Stripe client.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Stripe secret API key (`sk_test_...` or `sk_live_...`)
    /// * `webhook_secret` - Optional webhook signing secret (`whsec_...`)
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        api_key: impl Into<String>,
        webhook_secret: Option<String>,
    ) -> Result<Self, StripeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| StripeError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            webhook_secret,
        })
    }

    /// Override the API base URL (used in tests with a mock server).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Create a subscription-mode Checkout session for the pro plan.
    ///
    /// The account ID is attached both as `client_reference_id` and as
    /// metadata on the session and the subscription, so either the webhook
    /// or the synchronous confirmation path can recover it.
    pub async fn create_subscription_checkout(
        &self,
        account_id: &str,
        price_id: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSession, StripeError> {
        let params = vec![
            ("mode", "subscription".to_string()),
            ("success_url", success_url.to_string()),
            ("cancel_url", cancel_url.to_string()),
            ("client_reference_id", account_id.to_string()),
            ("line_items[0][price]", price_id.to_string()),
            ("line_items[0][quantity]", "1".to_string()),
            ("metadata[account_id]", account_id.to_string()),
            (
                "subscription_data[metadata][account_id]",
                account_id.to_string(),
            ),
        ];

        tracing::debug!(
            account_id = %account_id,
            price_id = %price_id,
            "Creating Stripe checkout session"
        );

        let response = self
            .client
            .post(format!("{}/checkout/sessions", self.base_url))
            .basic_auth(&self.api_key, Option::<&str>::None)
            .form(&params)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Retrieve a Checkout session by ID.
    pub async fn get_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<CheckoutSession, StripeError> {
        let response = self
            .client
            .get(format!("{}/checkout/sessions/{}", self.base_url, session_id))
            .basic_auth(&self.api_key, Option::<&str>::None)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Retrieve a subscription by ID.
    pub async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Subscription, StripeError> {
        let response = self
            .client
            .get(format!("{}/subscriptions/{}", self.base_url, subscription_id))
            .basic_auth(&self.api_key, Option::<&str>::None)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// List active subscriptions for a customer.
    pub async fn list_active_subscriptions(
        &self,
        customer_id: &str,
    ) -> Result<StripeList<Subscription>, StripeError> {
        let response = self
            .client
            .get(format!("{}/subscriptions", self.base_url))
            .basic_auth(&self.api_key, Option::<&str>::None)
            .query(&[("customer", customer_id), ("status", "active")])
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Cancel a subscription immediately.
    pub async fn cancel_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Subscription, StripeError> {
        let response = self
            .client
            .delete(format!("{}/subscriptions/{}", self.base_url, subscription_id))
            .basic_auth(&self.api_key, Option::<&str>::None)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    /// Verify a webhook signature header.
    ///
    /// # Arguments
    ///
    /// * `payload` - Raw request body
    /// * `signature` - Value of the `Stripe-Signature` header
    ///   (format: `t=timestamp,v1=signature[,v1=...]`)
    ///
    /// # Errors
    ///
    /// Returns `StripeError::InvalidSignature` if no provided signature
    /// matches, or `StripeError::Configuration` if no secret is set.
    pub fn verify_webhook_signature(
        &self,
        payload: &str,
        signature: &str,
    ) -> Result<(), StripeError> {
        let secret = self
            .webhook_secret
            .as_ref()
            .ok_or_else(|| StripeError::Configuration("webhook secret not configured".into()))?;

        let mut timestamp: Option<&str> = None;
        let mut signatures: Vec<&str> = Vec::new();

        for part in signature.split(',') {
            let mut kv = part.splitn(2, '=');
            match (kv.next(), kv.next()) {
                (Some("t"), Some(ts)) => timestamp = Some(ts),
                (Some("v1"), Some(sig)) => signatures.push(sig),
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(StripeError::InvalidSignature)?;

        if signatures.is_empty() {
            return Err(StripeError::InvalidSignature);
        }

        let signed_payload = format!("{timestamp}.{payload}");
        let expected = hmac_sha256_hex(secret, &signed_payload);

        let valid = signatures.iter().any(|sig| constant_time_eq(&expected, sig));

        if valid {
            Ok(())
        } else {
            Err(StripeError::InvalidSignature)
        }
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, StripeError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        // Try to parse error response
        let error_body: Result<StripeErrorResponse, _> = response.json().await;

        match error_body {
            Ok(stripe_error) => Err(StripeError::Api {
                error_type: stripe_error.error.error_type,
                message: stripe_error.error.message,
                code: stripe_error.error.code,
            }),
            Err(_) => Err(StripeError::Api {
                error_type: "unknown".to_string(),
                message: format!("HTTP {status}"),
                code: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_with_secret(secret: &str) -> StripeClient {
        StripeClient::new("sk_test_xxx", Some(secret.to_string())).unwrap()
    }

    #[test]
    fn client_creation() {
        let client = StripeClient::new("sk_test_xxx", None).unwrap();
        assert!(client.webhook_secret.is_none());
        assert_eq!(client.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn base_url_override() {
        let client = StripeClient::new("sk_test_xxx", None)
            .unwrap()
            .with_base_url("http://localhost:1234");
        assert_eq!(client.base_url, "http://localhost:1234");
    }

    #[test]
    fn webhook_signature_valid() {
        let client = client_with_secret("whsec_test");
        let payload = r#"{"id":"evt_1"}"#;
        let signed = format!("1700000000.{payload}");
        let sig = hmac_sha256_hex("whsec_test", &signed);
        let header = format!("t=1700000000,v1={sig}");

        assert!(client.verify_webhook_signature(payload, &header).is_ok());
    }

    #[test]
    fn webhook_signature_invalid() {
        let client = client_with_secret("whsec_test");
        let header = "t=1700000000,v1=deadbeef";

        let result = client.verify_webhook_signature("{}", header);
        assert!(matches!(result, Err(StripeError::InvalidSignature)));
    }

    #[test]
    fn webhook_signature_missing_parts() {
        let client = client_with_secret("whsec_test");
        assert!(client.verify_webhook_signature("{}", "v1=abc").is_err());
        assert!(client.verify_webhook_signature("{}", "t=123").is_err());
        assert!(client.verify_webhook_signature("{}", "").is_err());
    }

    #[test]
    fn webhook_signature_accepts_any_matching_v1() {
        let client = client_with_secret("whsec_test");
        let payload = "body";
        let signed = format!("42.{payload}");
        let sig = hmac_sha256_hex("whsec_test", &signed);
        let header = format!("t=42,v1=bogus,v1={sig}");

        assert!(client.verify_webhook_signature(payload, &header).is_ok());
    }

    #[test]
    fn webhook_signature_without_secret_is_config_error() {
        let client = StripeClient::new("sk_test_xxx", None).unwrap();
        let result = client.verify_webhook_signature("{}", "t=1,v1=abc");
        assert!(matches!(result, Err(StripeError::Configuration(_))));
    }
}
