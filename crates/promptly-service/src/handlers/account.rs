//! Account handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use promptly_core::{Account, AccountId, Tier};
use promptly_store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Usage summary included in account and generation responses.
#[derive(Debug, Serialize)]
pub struct UsageSummary {
    /// Authoritative generation count.
    pub used: u64,
    /// Ceiling for the account's tier (absent for unlimited tiers).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ceiling: Option<u64>,
    /// Generations left before the ceiling (absent for unlimited tiers).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining: Option<u64>,
}

/// Account response.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    /// Account ID.
    pub id: String,
    /// Subscription tier.
    pub tier: Tier,
    /// Whether a payment customer is linked.
    pub has_payment_method: bool,
    /// Usage against the current plan.
    pub usage: UsageSummary,
}

/// Handle GET /v1/account - current account with tier and quota standing.
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = load_or_create_account(&state, auth.account_id)?;
    let used = state.store.count_prompts(&account.id)?;

    Ok(Json(AccountResponse {
        id: account.id.to_string(),
        tier: account.tier,
        has_payment_method: account.stripe_customer_id.is_some(),
        usage: usage_summary(&state, account.tier, used),
    }))
}

/// Build a usage summary from the plan table and an authoritative count.
pub(crate) fn usage_summary(state: &AppState, tier: Tier, used: u64) -> UsageSummary {
    UsageSummary {
        used,
        ceiling: state.config.plans.ceiling(tier),
        remaining: state.config.plans.remaining(tier, used),
    }
}

/// Load the caller's account, creating a free-tier record on first touch.
///
/// Accounts come into existence lazily: the identity provider owns signup,
/// and the first authenticated request materializes the local record.
pub(crate) fn load_or_create_account(
    state: &AppState,
    account_id: AccountId,
) -> Result<Account, ApiError> {
    if let Some(account) = state.store.get_account(&account_id)? {
        return Ok(account);
    }

    let account = Account::new(account_id);
    state.store.put_account(&account)?;

    tracing::info!(account_id = %account_id, "Created account on first request");

    Ok(account)
}
