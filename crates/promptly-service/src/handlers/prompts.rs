//! Prompt generation and history handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use promptly_core::PromptRecord;
use promptly_store::Store;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::generator::PromptRequest;
use crate::handlers::account::{load_or_create_account, usage_summary, UsageSummary};
use crate::quota::{QuotaDecision, QuotaEnforcer};
use crate::state::AppState;

/// Default page size for history listing.
const DEFAULT_LIST_LIMIT: usize = 20;

/// Maximum page size for history listing.
const MAX_LIST_LIMIT: usize = 100;

/// Request to generate a prompt.
#[derive(Debug, Deserialize)]
pub struct GeneratePromptRequest {
    /// Topic or niche the prompt should target.
    pub niche: String,
    /// What the prompt should achieve.
    pub objective: String,
    /// Content format.
    pub content_type: String,
}

/// A generated prompt.
#[derive(Debug, Serialize)]
pub struct PromptResponse {
    /// Record ID.
    pub id: String,
    /// Generated text.
    pub content: String,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// Usage standing after this generation.
    pub usage: UsageSummary,
}

/// Handle POST /v1/prompts - metered prompt generation.
///
/// Admission is decided against the authoritative ledger count before the
/// generation call; the ledger append (the consumption event) happens only
/// after the generation succeeds, so failed generations never cost quota.
pub async fn generate_prompt(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(request): Json<GeneratePromptRequest>,
) -> Result<Json<PromptResponse>, ApiError> {
    if request.niche.trim().is_empty() || request.objective.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "niche and objective must not be empty".into(),
        ));
    }

    let account = load_or_create_account(&state, auth.account_id)?;

    let enforcer = QuotaEnforcer::new(state.store.clone(), state.config.plans.clone());
    if let QuotaDecision::Denied { used, ceiling } = enforcer.try_consume(&account)? {
        return Err(ApiError::QuotaExceeded { used, ceiling });
    }

    let generator = state
        .generator
        .as_ref()
        .ok_or_else(|| ApiError::GenerationFailed("generation backend not configured".into()))?;

    let content = generator
        .generate(&PromptRequest {
            niche: request.niche,
            objective: request.objective,
            content_type: request.content_type,
            tier: account.tier,
        })
        .await?;

    let record = PromptRecord::new(account.id, content);
    let used = enforcer.record_success(&record)?;

    tracing::info!(
        account_id = %account.id,
        prompt_id = %record.id,
        tier = %account.tier.as_str(),
        used,
        "Prompt generated"
    );

    Ok(Json(PromptResponse {
        id: record.id.to_string(),
        content: record.content,
        created_at: record.created_at,
        usage: usage_summary(&state, account.tier, used),
    }))
}

/// Query parameters for history listing.
#[derive(Debug, Deserialize)]
pub struct ListPromptsQuery {
    /// Page size (default 20, max 100).
    pub limit: Option<usize>,
    /// Number of records to skip.
    pub offset: Option<usize>,
}

/// A history entry.
#[derive(Debug, Serialize)]
pub struct PromptHistoryEntry {
    /// Record ID.
    pub id: String,
    /// Generated text.
    pub content: String,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

/// History response.
#[derive(Debug, Serialize)]
pub struct ListPromptsResponse {
    /// History entries, newest first.
    pub prompts: Vec<PromptHistoryEntry>,
    /// Total records for the account.
    pub total: u64,
}

/// Handle GET /v1/prompts - generation history, newest first.
pub async fn list_prompts(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<ListPromptsQuery>,
) -> Result<Json<ListPromptsResponse>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .min(MAX_LIST_LIMIT);
    let offset = query.offset.unwrap_or(0);

    let records = state.store.list_prompts(&auth.account_id, limit, offset)?;
    let total = state.store.count_prompts(&auth.account_id)?;

    let prompts = records
        .into_iter()
        .map(|record| PromptHistoryEntry {
            id: record.id.to_string(),
            content: record.content,
            created_at: record.created_at,
        })
        .collect();

    Ok(Json(ListPromptsResponse { prompts, total }))
}
