//! Common test utilities for promptly integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum_test::TestServer;
use tempfile::TempDir;

use promptly_core::{AccountId, PlanCatalog, PlanSpec};
use promptly_service::crypto::hmac_sha256_hex;
use promptly_service::{
    create_router, AppState, GeneratorError, PromptGenerator, PromptRequest, ServiceConfig,
    StripeClient,
};
use promptly_store::RocksStore;

/// Webhook signing secret used across webhook tests.
pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret";

/// Generator stub that always succeeds and counts invocations.
pub struct StubGenerator {
    calls: AtomicUsize,
}

impl StubGenerator {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PromptGenerator for StubGenerator {
    async fn generate(&self, request: &PromptRequest) -> Result<String, GeneratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!(
            "Write a {} about {} that drives {}",
            request.content_type, request.niche, request.objective
        ))
    }
}

/// Generator stub that always fails, for non-consumption tests.
pub struct FailingGenerator;

#[async_trait]
impl PromptGenerator for FailingGenerator {
    async fn generate(&self, _request: &PromptRequest) -> Result<String, GeneratorError> {
        Err(GeneratorError::Api {
            status: 500,
            message: "upstream exploded".into(),
        })
    }
}

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Temporary directory for the database (kept alive for test duration).
    pub _temp_dir: TempDir,
    /// Direct handle to the store for setup and assertions.
    pub store: Arc<RocksStore>,
    /// A test account ID for authenticated requests.
    pub account_id: AccountId,
    /// The stub generator, for call-count assertions.
    pub generator: Arc<StubGenerator>,
}

impl TestHarness {
    /// Create a harness with default plans and a succeeding generator.
    pub fn new() -> Self {
        Self::build(PlanCatalog::default(), None, None)
    }

    /// Create a harness with a custom free-tier ceiling.
    pub fn with_free_ceiling(ceiling: u64) -> Self {
        let plans = PlanCatalog {
            free: PlanSpec {
                ceiling: Some(ceiling),
                price_cents: 0,
            },
            ..PlanCatalog::default()
        };
        Self::build(plans, None, None)
    }

    /// Create a harness whose generator always fails.
    pub fn with_failing_generator() -> Self {
        Self::build(
            PlanCatalog::default(),
            Some(Arc::new(FailingGenerator)),
            None,
        )
    }

    /// Create a harness whose Stripe client talks to a mock server.
    pub fn with_stripe_mock(base_url: &str) -> Self {
        Self::build(PlanCatalog::default(), None, Some(base_url.to_string()))
    }

    fn build(
        plans: PlanCatalog,
        generator_override: Option<Arc<dyn PromptGenerator>>,
        stripe_base_url: Option<String>,
    ) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = Arc::new(RocksStore::open(temp_dir.path()).expect("Failed to open store"));

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir: temp_dir.path().to_string_lossy().to_string(),
            auth_base_url: "http://localhost".into(),
            auth_audience: "promptly".into(),
            stripe_api_key: None,
            stripe_webhook_secret: Some(TEST_WEBHOOK_SECRET.into()),
            stripe_price_id: Some("price_test_pro".into()),
            generator_api_key: None,
            generator_api_url: "http://localhost".into(),
            generator_model_free: "test-model-free".into(),
            generator_model_pro: "test-model-pro".into(),
            frontend_url: "http://localhost:3000".into(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            plans,
        };

        let stub = Arc::new(StubGenerator::new());
        let generator: Arc<dyn PromptGenerator> = match generator_override {
            Some(g) => g,
            None => stub.clone(),
        };

        let stripe = StripeClient::new("sk_test_xxx", Some(TEST_WEBHOOK_SECRET.into()))
            .expect("Failed to create Stripe client");
        let stripe = match stripe_base_url {
            Some(url) => stripe.with_base_url(url),
            None => stripe,
        };

        let state = AppState::new(store.clone(), config)
            .with_generator(generator)
            .with_stripe(Arc::new(stripe));

        let router: Router = create_router(state);
        let server = TestServer::new(router).expect("Failed to create test server");
        let account_id = AccountId::generate();

        Self {
            server,
            _temp_dir: temp_dir,
            store,
            account_id,
            generator: stub,
        }
    }

    /// Get the authorization header for the harness account.
    pub fn auth_header(&self) -> String {
        format!("Bearer test-token:{}", self.account_id)
    }

    /// Get a different account's auth header (for testing isolation).
    pub fn other_auth_header() -> String {
        let other = AccountId::generate();
        format!("Bearer test-token:{other}")
    }

    /// Build a signed `Stripe-Signature` header for a webhook payload.
    pub fn stripe_signature(payload: &str) -> String {
        let timestamp = 1_700_000_000u64;
        let signed = format!("{timestamp}.{payload}");
        let signature = hmac_sha256_hex(TEST_WEBHOOK_SECRET, &signed);
        format!("t={timestamp},v1={signature}")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
