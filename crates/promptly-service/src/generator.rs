//! Prompt generation dependency.
//!
//! The generation API is a black-box external collaborator: it returns text
//! or fails. The `PromptGenerator` trait is the seam the quota flow depends
//! on, so tests can substitute a stub and the HTTP implementation stays
//! swappable.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use promptly_core::Tier;

/// Error type for generation operations.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The generation API returned an error status.
    #[error("generation API error: HTTP {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error body, if readable.
        message: String,
    },

    /// The API responded but produced no usable text.
    #[error("generation API returned no content")]
    EmptyCompletion,

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// A request for generated prompts.
#[derive(Debug, Clone)]
pub struct PromptRequest {
    /// Topic or niche the prompts should target.
    pub niche: String,
    /// What the prompts should achieve (engagement, sales, ...).
    pub objective: String,
    /// Content format (post, story, video script, ...).
    pub content_type: String,
    /// Tier of the requesting account; selects the model.
    pub tier: Tier,
}

/// The generation dependency.
#[async_trait]
pub trait PromptGenerator: Send + Sync {
    /// Generate prompt text for the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the downstream API fails or yields no content.
    /// Callers must not consume quota on error.
    async fn generate(&self, request: &PromptRequest) -> Result<String, GeneratorError>;
}

// ============================================================================
// OpenAI-compatible HTTP implementation
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Generator backed by an OpenAI-compatible chat-completions API.
#[derive(Debug, Clone)]
pub struct OpenAiGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model_free: String,
    model_pro: String,
}

impl OpenAiGenerator {
    /// Create a new generator client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model_free: impl Into<String>,
        model_pro: impl Into<String>,
    ) -> Result<Self, GeneratorError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| GeneratorError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model_free: model_free.into(),
            model_pro: model_pro.into(),
        })
    }

    fn model_for(&self, tier: Tier) -> &str {
        match tier {
            Tier::Free => &self.model_free,
            Tier::Pro => &self.model_pro,
        }
    }
}

#[async_trait]
impl PromptGenerator for OpenAiGenerator {
    async fn generate(&self, request: &PromptRequest) -> Result<String, GeneratorError> {
        let body = ChatCompletionRequest {
            model: self.model_for(request.tier),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "You are an expert content strategist. Write one concise, \
                              ready-to-use content prompt for the user's niche and objective. \
                              Return only the prompt text."
                        .to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: format!(
                        "Niche: {}\nObjective: {}\nContent type: {}",
                        request.niche, request.objective, request.content_type
                    ),
                },
            ],
            temperature: 0.8,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let completion: ChatCompletionResponse = response.json().await?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(GeneratorError::EmptyCompletion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_generator() -> OpenAiGenerator {
        OpenAiGenerator::new("http://localhost", "sk-test", "small-model", "big-model").unwrap()
    }

    #[test]
    fn model_selection_by_tier() {
        let generator = test_generator();
        assert_eq!(generator.model_for(Tier::Free), "small-model");
        assert_eq!(generator.model_for(Tier::Pro), "big-model");
    }

    #[test]
    fn completion_response_parsing() {
        let json = r#"{"choices":[{"message":{"role":"assistant","content":"a prompt"}}]}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some("a prompt")
        );
    }
}
