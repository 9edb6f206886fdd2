//! Billing handlers: checkout creation, confirmation, and cancellation.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use promptly_core::{AccountId, Tier};
use promptly_store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::handlers::account::load_or_create_account;
use crate::state::AppState;
use crate::stripe::{CheckoutSession, StripeClient};
use crate::sync::TierSync;

/// Checkout creation response.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    /// Session ID.
    pub session_id: String,
    /// URL to redirect the user to.
    pub checkout_url: String,
}

/// Handle POST /v1/billing/checkout - start a pro upgrade.
pub async fn create_checkout(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let account = load_or_create_account(&state, auth.account_id)?;

    if account.is_pro() {
        return Err(ApiError::Conflict("account is already on pro".into()));
    }

    let stripe = require_stripe(&state)?;
    let price_id = state
        .config
        .stripe_price_id
        .as_ref()
        .ok_or_else(|| ApiError::Internal("Stripe price not configured".into()))?;

    let success_url = format!(
        "{}/billing/success?session_id={{CHECKOUT_SESSION_ID}}",
        state.config.frontend_url
    );
    let cancel_url = format!("{}/billing/cancelled", state.config.frontend_url);

    let session = stripe
        .create_subscription_checkout(
            &account.id.to_string(),
            price_id,
            &success_url,
            &cancel_url,
        )
        .await?;

    let checkout_url = session
        .url
        .ok_or_else(|| ApiError::ExternalService("checkout session has no URL".into()))?;

    tracing::info!(
        account_id = %account.id,
        session_id = %session.id,
        "Created checkout session"
    );

    Ok(Json(CheckoutResponse {
        session_id: session.id,
        checkout_url,
    }))
}

/// Checkout confirmation request.
#[derive(Debug, Deserialize)]
pub struct ConfirmCheckoutRequest {
    /// Checkout session ID returned on redirect.
    pub session_id: String,
}

/// Tier change response.
#[derive(Debug, Serialize)]
pub struct TierResponse {
    /// Account ID.
    pub account_id: String,
    /// Tier after the operation.
    pub tier: Tier,
}

/// Handle POST /v1/billing/confirm - synchronous upgrade after redirect.
///
/// The redirect back from checkout races the webhook; whichever lands first
/// performs the same idempotent pro upsert, so processing both is harmless.
pub async fn confirm_checkout(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Json(request): Json<ConfirmCheckoutRequest>,
) -> Result<Json<TierResponse>, ApiError> {
    let stripe = require_stripe(&state)?;

    let session = stripe.get_checkout_session(&request.session_id).await?;

    if !session.is_paid() {
        tracing::info!(
            session_id = %session.id,
            payment_status = ?session.payment_status,
            status = ?session.status,
            "Checkout confirmation with incomplete payment"
        );
        return Err(ApiError::PaymentNotConfirmed);
    }

    let (account_id, customer_id) = resolve_session_identity(stripe, &session).await?;

    let sync = TierSync::new(state.store.clone());
    let account = sync.ensure_pro(account_id, &customer_id)?;

    Ok(Json(TierResponse {
        account_id: account.id.to_string(),
        tier: account.tier,
    }))
}

/// Cancellation response.
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    /// Account ID.
    pub account_id: String,
    /// Tier after the operation.
    pub tier: Tier,
    /// Subscriptions cancelled at the processor.
    pub cancelled_subscriptions: usize,
}

/// Handle POST /v1/billing/cancel - cancel the pro subscription.
///
/// Every active processor subscription for the customer is cancelled; the
/// local downgrade happens only once all of them are gone. On partial
/// failure the account stays pro so a retry can finish the job.
pub async fn cancel_subscription(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<CancelResponse>, ApiError> {
    let account = state
        .store
        .get_account(&auth.account_id)?
        .ok_or(ApiError::NothingToCancel)?;

    if !account.is_pro() {
        return Err(ApiError::NothingToCancel);
    }

    let Some(customer_id) = account.stripe_customer_id.as_deref() else {
        return Err(ApiError::NothingToCancel);
    };

    let stripe = require_stripe(&state)?;

    let subscriptions = stripe.list_active_subscriptions(customer_id).await?;

    if subscriptions.data.is_empty() {
        return Err(ApiError::NothingToCancel);
    }

    let mut cancelled = 0usize;
    let mut failed = 0usize;

    for subscription in &subscriptions.data {
        match stripe.cancel_subscription(&subscription.id).await {
            Ok(_) => cancelled += 1,
            Err(e) => {
                tracing::error!(
                    subscription_id = %subscription.id,
                    error = %e,
                    "Failed to cancel subscription"
                );
                failed += 1;
            }
        }
    }

    if cancelled == 0 && failed > 0 {
        // Nothing went through at all: plain dependency failure.
        return Err(ApiError::ExternalService(
            "subscription cancellation failed".into(),
        ));
    }

    if failed > 0 {
        // The account keeps pro access it is arguably still paying for;
        // the retry path re-lists and finishes the remaining cancellations.
        return Err(ApiError::PartialCancellation { cancelled, failed });
    }

    let downgraded = state.store.downgrade_to_free(&account.id)?;

    tracing::info!(
        account_id = %account.id,
        cancelled,
        "Subscription cancelled and account downgraded"
    );

    Ok(Json(CancelResponse {
        account_id: downgraded.id.to_string(),
        tier: downgraded.tier,
        cancelled_subscriptions: cancelled,
    }))
}

/// Get the Stripe client or fail with a configuration error.
fn require_stripe(state: &AppState) -> Result<&StripeClient, ApiError> {
    state
        .stripe
        .as_deref()
        .ok_or_else(|| ApiError::Internal("payments not configured".into()))
}

/// Recover the account identity and customer reference from a session.
///
/// The account ID lives in the session metadata; older sessions carried it
/// only on the subscription, so that is the fallback before giving up.
async fn resolve_session_identity(
    stripe: &StripeClient,
    session: &CheckoutSession,
) -> Result<(AccountId, String), ApiError> {
    let mut account_id_str = session
        .metadata_account_id()
        .map(ToString::to_string)
        .or_else(|| session.client_reference_id.clone());
    let mut customer_id = session.customer.clone();

    if account_id_str.is_none() || customer_id.is_none() {
        if let Some(subscription_id) = &session.subscription {
            let subscription = stripe.get_subscription(subscription_id).await?;
            if account_id_str.is_none() {
                account_id_str = subscription.metadata_account_id().map(ToString::to_string);
            }
            if customer_id.is_none() {
                customer_id = subscription.customer.clone();
            }
        }
    }

    let account_id = account_id_str
        .ok_or(ApiError::AccountIdentifierMissing)?
        .parse::<AccountId>()
        .map_err(|_| ApiError::AccountIdentifierMissing)?;

    let customer_id = customer_id
        .ok_or_else(|| ApiError::ExternalService("checkout session has no customer".into()))?;

    Ok((account_id, customer_id))
}
