//! Service configuration.

use serde::Deserialize;
use std::path::Path;

use promptly_core::PlanCatalog;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to `RocksDB` data directory (default: "/data/promptly").
    pub data_dir: String,

    /// JWT validation base URL.
    pub auth_base_url: String,

    /// Expected JWT audience (default: "promptly").
    pub auth_audience: String,

    /// Stripe API key (optional).
    pub stripe_api_key: Option<String>,

    /// Stripe webhook secret (optional).
    pub stripe_webhook_secret: Option<String>,

    /// Stripe price ID for the pro subscription.
    pub stripe_price_id: Option<String>,

    /// Generation API key (optional).
    pub generator_api_key: Option<String>,

    /// Generation API base URL (default: OpenAI).
    pub generator_api_url: String,

    /// Model used for free-tier generations.
    pub generator_model_free: String,

    /// Model used for pro-tier generations.
    pub generator_model_pro: String,

    /// Frontend URL for checkout redirects.
    pub frontend_url: String,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Plan policy table.
    pub plans: PlanCatalog,
}

/// Stripe secrets file structure.
#[derive(Debug, Deserialize)]
struct StripeSecrets {
    api_key: String,
    #[serde(default)]
    webhook_secret: Option<String>,
    #[serde(default)]
    price_id: Option<String>,
}

/// Generation API secrets file structure.
#[derive(Debug, Deserialize)]
struct GeneratorSecrets {
    api_key: String,
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        // Try to load secrets from files first, then fall back to env vars
        let (stripe_api_key, stripe_webhook_secret, stripe_price_id) = load_stripe_secrets();
        let generator_api_key = load_generator_secrets();

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/promptly".into()),
            auth_base_url: std::env::var("AUTH_BASE_URL")
                .unwrap_or_else(|_| "https://auth.promptly.dev".into()),
            auth_audience: std::env::var("AUTH_AUDIENCE").unwrap_or_else(|_| "promptly".into()),
            stripe_api_key,
            stripe_webhook_secret,
            stripe_price_id: stripe_price_id.or_else(|| std::env::var("STRIPE_PRICE_ID").ok()),
            generator_api_key,
            generator_api_url: std::env::var("GENERATOR_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".into()),
            generator_model_free: std::env::var("GENERATOR_MODEL_FREE")
                .unwrap_or_else(|_| "gpt-4o-mini".into()),
            generator_model_pro: std::env::var("GENERATOR_MODEL_PRO")
                .unwrap_or_else(|_| "gpt-4o".into()),
            frontend_url: std::env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024 * 1024), // 1MB
            request_timeout_seconds: std::env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            plans: load_plan_catalog(),
        }
    }
}

/// Load the plan table, allowing the free ceiling to be tuned via env.
fn load_plan_catalog() -> PlanCatalog {
    let mut plans = PlanCatalog::default();
    if let Some(ceiling) = std::env::var("FREE_TIER_CEILING")
        .ok()
        .and_then(|s| s.parse().ok())
    {
        plans.free.ceiling = Some(ceiling);
    }
    plans
}

/// Load Stripe secrets from file or environment.
fn load_stripe_secrets() -> (Option<String>, Option<String>, Option<String>) {
    let secret_paths = [
        ".secrets/stripe.json",
        "promptly/.secrets/stripe.json",
        "../.secrets/stripe.json",
    ];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<StripeSecrets>(path) {
            tracing::info!(path = %path, "Loaded Stripe secrets from file");
            return (
                Some(secrets.api_key),
                secrets.webhook_secret,
                secrets.price_id,
            );
        }
    }

    // Fall back to environment variables
    tracing::debug!("Stripe secrets file not found, using environment variables");
    (
        std::env::var("STRIPE_API_KEY").ok(),
        std::env::var("STRIPE_WEBHOOK_SECRET").ok(),
        None,
    )
}

/// Load generation API secrets from file or environment.
fn load_generator_secrets() -> Option<String> {
    let secret_paths = [
        ".secrets/generator.json",
        "promptly/.secrets/generator.json",
        "../.secrets/generator.json",
    ];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<GeneratorSecrets>(path) {
            tracing::info!(path = %path, "Loaded generator secrets from file");
            return Some(secrets.api_key);
        }
    }

    tracing::debug!("Generator secrets file not found, using environment variables");
    std::env::var("GENERATOR_API_KEY")
        .or_else(|_| std::env::var("OPENAI_API_KEY"))
        .ok()
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/promptly".into(),
            auth_base_url: "https://auth.promptly.dev".into(),
            auth_audience: "promptly".into(),
            stripe_api_key: None,
            stripe_webhook_secret: None,
            stripe_price_id: None,
            generator_api_key: None,
            generator_api_url: "https://api.openai.com/v1".into(),
            generator_model_free: "gpt-4o-mini".into(),
            generator_model_pro: "gpt-4o".into(),
            frontend_url: "http://localhost:3000".into(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            plans: PlanCatalog::default(),
        }
    }
}
