//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{account, billing, health, prompts, webhooks};
use crate::state::AppState;

/// Maximum concurrent requests for generation endpoints.
/// Each request holds an upstream generation call, so the limit is tight.
const GENERATION_MAX_CONCURRENT_REQUESTS: usize = 30;

/// Maximum concurrent requests for general API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Prompts (JWT auth, quota enforced)
/// - `POST /v1/prompts` - Generate a prompt
/// - `GET /v1/prompts` - Generation history
///
/// ## Account (JWT auth)
/// - `GET /v1/account` - Current account with tier and quota standing
///
/// ## Billing (JWT auth)
/// - `POST /v1/billing/checkout` - Start a pro upgrade
/// - `POST /v1/billing/confirm` - Confirm checkout after redirect
/// - `POST /v1/billing/cancel` - Cancel the pro subscription
///
/// ## Webhooks (signature verification)
/// - `POST /webhooks/stripe` - Stripe webhooks
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    // Generation routes get their own, tighter concurrency limit since each
    // in-flight request occupies an upstream API call.
    let prompt_routes = Router::new()
        .route(
            "/",
            post(prompts::generate_prompt).get(prompts::list_prompts),
        )
        .layer(ConcurrencyLimitLayer::new(GENERATION_MAX_CONCURRENT_REQUESTS));

    let api_routes = Router::new()
        .nest("/prompts", prompt_routes)
        .route("/account", get(account::get_account))
        .route("/billing/checkout", post(billing::create_checkout))
        .route("/billing/confirm", post(billing::confirm_checkout))
        .route("/billing/cancel", post(billing::cancel_subscription))
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        // Health (public, no rate limit)
        .route("/health", get(health::health))
        // API v1 routes (rate limited)
        .nest("/v1", api_routes)
        // Webhooks (no rate limit - controlled by external services)
        .route("/webhooks/stripe", post(webhooks::stripe_webhook))
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
