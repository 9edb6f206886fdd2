//! Stripe webhook handler.
//!
//! Events drive tier synchronization: subscription activation upgrades the
//! account named in the event metadata, deletion downgrades the account
//! linked to the customer reference. Events may be duplicated or arrive out
//! of order; both transitions are idempotent and a processed-event cache
//! short-circuits exact replays.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use promptly_core::AccountId;
use promptly_store::Store;

use crate::error::ApiError;
use crate::state::AppState;
use crate::stripe::Subscription;
use crate::sync::TierSync;

/// Stripe webhook payload (simplified).
#[derive(Debug, Deserialize)]
pub struct StripeWebhook {
    /// Event ID.
    pub id: String,
    /// Event type.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event data.
    pub data: StripeEventData,
}

/// Stripe event data container.
#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    /// Event object.
    pub object: serde_json::Value,
}

/// Webhook response.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// Whether the webhook was processed.
    pub received: bool,
    /// Set when the event was a replay of one already processed.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub duplicate: bool,
}

/// Handle Stripe webhooks.
pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookResponse>, ApiError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest("Missing Stripe signature".into()))?;

    let stripe = state
        .stripe
        .as_ref()
        .ok_or_else(|| ApiError::Internal("payments not configured".into()))?;

    stripe.verify_webhook_signature(&body, signature).map_err(|e| {
        tracing::warn!(error = %e, "Invalid Stripe webhook signature");
        ApiError::BadRequest("Invalid webhook signature".into())
    })?;

    let webhook: StripeWebhook =
        serde_json::from_str(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    tracing::info!(
        event_type = %webhook.event_type,
        event_id = %webhook.id,
        "Received Stripe webhook"
    );

    // Replays of an already-processed event are acknowledged without
    // re-running the handler.
    if state.store.has_webhook_event(&webhook.id)? {
        tracing::debug!(event_id = %webhook.id, "Duplicate webhook event");
        return Ok(Json(WebhookResponse {
            received: true,
            duplicate: true,
        }));
    }

    match webhook.event_type.as_str() {
        "customer.subscription.created" => {
            handle_subscription_activated(&state, &webhook.data.object)?;
        }
        "customer.subscription.deleted" => {
            handle_subscription_deleted(&state, &webhook.data.object)?;
        }
        "invoice.payment_failed" => {
            handle_payment_failed(&webhook.data.object);
        }
        _ => {
            // Everything else is acknowledged without mutation so the
            // processor stops retrying. This includes subscription updates:
            // plan changes on processor-managed subscriptions may carry no
            // account metadata, and rejecting them would leave the event
            // stuck in redelivery.
            tracing::debug!(event_type = %webhook.event_type, "Unhandled Stripe event");
        }
    }

    state.store.record_webhook_event(&webhook.id)?;

    Ok(Json(WebhookResponse {
        received: true,
        duplicate: false,
    }))
}

/// Handle subscription activation: upgrade the account named in metadata.
fn handle_subscription_activated(
    state: &AppState,
    object: &serde_json::Value,
) -> Result<(), ApiError> {
    let subscription: Subscription = serde_json::from_value(object.clone())
        .map_err(|e| ApiError::BadRequest(format!("malformed subscription object: {e}")))?;

    // Activation events that aren't (or are no longer) active carry no
    // transition; the terminal deletion event handles the downgrade.
    if !matches!(subscription.status.as_str(), "active" | "trialing") {
        tracing::debug!(
            subscription_id = %subscription.id,
            status = %subscription.status,
            "Ignoring subscription event in non-active status"
        );
        return Ok(());
    }

    let account_id = subscription
        .metadata_account_id()
        .ok_or_else(|| {
            ApiError::BadRequest("subscription metadata carries no account identifier".into())
        })?
        .parse::<AccountId>()
        .map_err(|_| ApiError::BadRequest("invalid account identifier in metadata".into()))?;

    let customer_id = subscription
        .customer
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("subscription has no customer".into()))?;

    let sync = TierSync::new(state.store.clone());
    sync.ensure_pro(account_id, customer_id)?;

    Ok(())
}

/// Handle subscription deletion: downgrade by customer reference.
///
/// A deletion for a customer we never linked is acknowledged, not rejected;
/// there is nothing to converge.
fn handle_subscription_deleted(
    state: &AppState,
    object: &serde_json::Value,
) -> Result<(), ApiError> {
    let subscription: Subscription = serde_json::from_value(object.clone())
        .map_err(|e| ApiError::BadRequest(format!("malformed subscription object: {e}")))?;

    let Some(customer_id) = subscription.customer.as_deref() else {
        tracing::warn!(
            subscription_id = %subscription.id,
            "Subscription deletion without customer reference"
        );
        return Ok(());
    };

    let sync = TierSync::new(state.store.clone());
    sync.downgrade_by_customer(customer_id)?;

    Ok(())
}

/// Handle payment failure: informational only.
///
/// The processor retries payment on its own schedule and emits a deletion
/// event if the subscription ultimately lapses; no tier change happens here.
fn handle_payment_failed(object: &serde_json::Value) {
    let customer = object.get("customer").and_then(|v| v.as_str());
    tracing::warn!(
        customer = ?customer,
        "Invoice payment failed; awaiting processor resolution"
    );
}
