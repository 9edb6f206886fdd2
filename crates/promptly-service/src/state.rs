//! Application state.

use std::sync::Arc;

use promptly_store::RocksStore;

use crate::config::ServiceConfig;
use crate::generator::{OpenAiGenerator, PromptGenerator};
use crate::stripe::StripeClient;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<RocksStore>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Stripe client for payments (optional).
    pub stripe: Option<Arc<StripeClient>>,

    /// Prompt generation backend (optional).
    pub generator: Option<Arc<dyn PromptGenerator>>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(store: Arc<RocksStore>, config: ServiceConfig) -> Self {
        // Create Stripe client if configured
        let stripe = config.stripe_api_key.as_ref().and_then(|key| {
            match StripeClient::new(key, config.stripe_webhook_secret.clone()) {
                Ok(client) => {
                    tracing::info!("Stripe integration enabled");
                    Some(Arc::new(client))
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create Stripe client");
                    None
                }
            }
        });

        if stripe.is_none() {
            tracing::warn!("Stripe not configured - upgrades and cancellation will not be available");
        }

        // Create generation client if configured
        let generator: Option<Arc<dyn PromptGenerator>> =
            config.generator_api_key.as_ref().and_then(|key| {
                match OpenAiGenerator::new(
                    &config.generator_api_url,
                    key,
                    &config.generator_model_free,
                    &config.generator_model_pro,
                ) {
                    Ok(client) => {
                        tracing::info!(api_url = %config.generator_api_url, "Generation backend enabled");
                        Some(Arc::new(client) as Arc<dyn PromptGenerator>)
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to create generation client");
                        None
                    }
                }
            });

        if generator.is_none() {
            tracing::warn!("Generation API not configured - prompt generation will not be available");
        }

        Self {
            store,
            config,
            stripe,
            generator,
        }
    }

    /// Replace the generation backend (used in tests with a stub).
    #[must_use]
    pub fn with_generator(mut self, generator: Arc<dyn PromptGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Replace the Stripe client (used in tests with a mock server).
    #[must_use]
    pub fn with_stripe(mut self, stripe: Arc<StripeClient>) -> Self {
        self.stripe = Some(stripe);
        self
    }

    /// Check if Stripe is configured.
    #[must_use]
    pub fn has_stripe(&self) -> bool {
        self.stripe.is_some()
    }
}
