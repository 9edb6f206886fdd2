//! Promptly HTTP API Service.
//!
//! This crate provides the HTTP API for the promptly platform, including:
//!
//! - Metered prompt generation with free-tier quota enforcement
//! - Account tier/quota reads
//! - Stripe checkout, confirmation, and cancellation
//! - Stripe webhooks (tier synchronization)
//!
//! # Authentication
//!
//! End-user requests carry a JWT validated against the identity provider's
//! JWKS endpoint. Webhook requests are authenticated by signature instead.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Webhook handlers need async for consistency

pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod generator;
pub mod handlers;
pub mod quota;
pub mod routes;
pub mod state;
pub mod stripe;
pub mod sync;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use generator::{GeneratorError, OpenAiGenerator, PromptGenerator, PromptRequest};
pub use quota::{QuotaDecision, QuotaEnforcer};
pub use routes::create_router;
pub use state::AppState;
pub use stripe::{StripeClient, StripeError};
pub use sync::TierSync;
