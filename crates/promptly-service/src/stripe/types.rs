//! Stripe API types.

use serde::Deserialize;

/// Stripe Checkout session object.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    /// Session ID.
    pub id: String,
    /// Checkout URL to redirect the user to.
    #[serde(default)]
    pub url: Option<String>,
    /// Payment status ("paid", "unpaid", "no_payment_required").
    #[serde(default)]
    pub payment_status: Option<String>,
    /// Session status ("open", "complete", "expired").
    #[serde(default)]
    pub status: Option<String>,
    /// Customer ID.
    #[serde(default)]
    pub customer: Option<String>,
    /// Subscription ID (subscription-mode sessions).
    #[serde(default)]
    pub subscription: Option<String>,
    /// Client reference ID (our `account_id`).
    #[serde(default)]
    pub client_reference_id: Option<String>,
    /// Metadata.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl CheckoutSession {
    /// Whether the session reports a completed payment.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.payment_status.as_deref() == Some("paid")
            || self.status.as_deref() == Some("complete")
    }

    /// Account ID carried in the session metadata, if present.
    #[must_use]
    pub fn metadata_account_id(&self) -> Option<&str> {
        self.metadata.get("account_id").and_then(|v| v.as_str())
    }
}

/// Stripe subscription object.
#[derive(Debug, Clone, Deserialize)]
pub struct Subscription {
    /// Subscription ID.
    pub id: String,
    /// Status ("active", "canceled", "past_due", ...).
    #[serde(default)]
    pub status: String,
    /// Customer ID.
    #[serde(default)]
    pub customer: Option<String>,
    /// Metadata.
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl Subscription {
    /// Account ID carried in the subscription metadata, if present.
    #[must_use]
    pub fn metadata_account_id(&self) -> Option<&str> {
        self.metadata.get("account_id").and_then(|v| v.as_str())
    }
}

/// Stripe list response wrapper.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeList<T> {
    /// Object type (always "list").
    pub object: String,
    /// Data items.
    pub data: Vec<T>,
    /// Whether there are more items.
    #[serde(default)]
    pub has_more: bool,
}

/// Stripe API error response.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorResponse {
    /// Error details.
    pub error: StripeErrorDetail,
}

/// Stripe error detail.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorDetail {
    /// Error type.
    #[serde(rename = "type")]
    pub error_type: String,
    /// Error message.
    pub message: String,
    /// Error code.
    #[serde(default)]
    pub code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_is_paid_variants() {
        let paid: CheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_1", "payment_status": "paid"
        }))
        .unwrap();
        assert!(paid.is_paid());

        let complete: CheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_2", "status": "complete", "payment_status": "no_payment_required"
        }))
        .unwrap();
        assert!(complete.is_paid());

        let open: CheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_3", "status": "open", "payment_status": "unpaid"
        }))
        .unwrap();
        assert!(!open.is_paid());
    }

    #[test]
    fn metadata_account_id_extraction() {
        let session: CheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_1",
            "metadata": { "account_id": "abc" }
        }))
        .unwrap();
        assert_eq!(session.metadata_account_id(), Some("abc"));

        let bare: CheckoutSession =
            serde_json::from_value(serde_json::json!({ "id": "cs_2" })).unwrap();
        assert!(bare.metadata_account_id().is_none());
    }
}
