//! Text Generation Client
//!
//! Validates requests, fills in defaults, and drives the configured provider
//! through the shared [`RetryPolicy`].

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::provider::{Provider, ProviderRequest, TextProvider};
use super::retry::RetryPolicy;
use super::structured;
use crate::constants::generation;
use crate::types::{Result, SeoError};

/// Desired response format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Text,
    Json,
}

/// One generation call
#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub response_format: ResponseFormat,
    /// Step identifier, used for logs and fixture dispatch
    pub tag: Option<String>,
}

impl GenerateRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn system(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn json(mut self) -> Self {
        self.response_format = ResponseFormat::Json;
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

/// Result of a successful generation call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub content: String,
    pub tokens_used: Option<u32>,
    pub provider_id: String,
    pub model: String,
}

/// Client defaults applied when a request leaves a knob unset
#[derive(Debug, Clone, Copy)]
pub struct GenerationDefaults {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            temperature: generation::DEFAULT_TEMPERATURE,
            max_tokens: generation::DEFAULT_MAX_TOKENS,
        }
    }
}

/// Provider-agnostic generation client
#[derive(Debug, Clone)]
pub struct TextGenerationClient {
    provider: Arc<Provider>,
    retry: RetryPolicy,
    defaults: GenerationDefaults,
}

impl TextGenerationClient {
    pub fn new(provider: Provider) -> Self {
        Self::from_shared(Arc::new(provider))
    }

    pub fn from_shared(provider: Arc<Provider>) -> Self {
        Self {
            provider,
            retry: RetryPolicy::default(),
            defaults: GenerationDefaults::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_defaults(mut self, defaults: GenerationDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// Generate text, retrying transient provider failures
    #[instrument(skip(self, request), fields(provider = self.provider.name(), tag = ?request.tag))]
    pub async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        let resolved = self.resolve(request)?;
        let provider: &Provider = &self.provider;
        let request = &resolved;

        let reply = self
            .retry
            .run("generate", move || provider.generate(request))
            .await
            .map_err(|exhausted| {
                let attempts = exhausted.attempts;
                match exhausted.into_inner() {
                    // Permanent failures on the first try keep their own type
                    e if attempts == 1 && !e.is_retryable() => e,
                    e => SeoError::GenerationFailed {
                        provider: provider.name().to_string(),
                        attempts,
                        last_error: e.to_string(),
                    },
                }
            })?;

        debug!(
            chars = reply.text.len(),
            tokens = reply.usage.map(|u| u.total()),
            "Generation complete"
        );

        Ok(GenerateResponse {
            content: reply.text,
            tokens_used: reply.usage.map(|u| u.total()),
            provider_id: provider.name().to_string(),
            model: reply.model,
        })
    }

    /// Generate and parse a structured (JSON) payload into `T`
    pub async fn generate_structured<T: DeserializeOwned>(
        &self,
        request: GenerateRequest,
    ) -> Result<T> {
        let response = self.generate(request.json()).await?;
        Self::parse_structured(&response.content)
    }

    /// Extract a structured payload from free-form text
    pub fn parse_structured<T: DeserializeOwned>(content: &str) -> Result<T> {
        structured::parse_structured(content)
    }

    fn resolve(&self, request: GenerateRequest) -> Result<ProviderRequest> {
        if request.prompt.trim().is_empty() {
            return Err(SeoError::InvalidInput("prompt must not be empty".to_string()));
        }

        let temperature = request.temperature.unwrap_or(self.defaults.temperature);
        if !(0.0..=generation::MAX_TEMPERATURE).contains(&temperature) {
            return Err(SeoError::InvalidInput(format!(
                "temperature must be between 0.0 and {}, got {}",
                generation::MAX_TEMPERATURE,
                temperature
            )));
        }

        let max_tokens = request.max_tokens.unwrap_or(self.defaults.max_tokens);
        if max_tokens == 0 {
            return Err(SeoError::InvalidInput(
                "max_tokens must be greater than 0".to_string(),
            ));
        }

        Ok(ProviderRequest {
            prompt: request.prompt,
            system_prompt: request.system_prompt,
            temperature,
            max_tokens,
            json: request.response_format == ResponseFormat::Json,
            tag: request.tag,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::{FixtureProvider, FixtureReply};
    use std::time::{Duration, Instant};

    fn client(fixture: FixtureProvider, base: Duration) -> TextGenerationClient {
        TextGenerationClient::new(Provider::Fixture(fixture)).with_retry(RetryPolicy::new(3, base))
    }

    #[tokio::test]
    async fn test_third_attempt_succeeds_after_backoff() {
        let base = Duration::from_millis(25);
        let fixture = FixtureProvider::new().script(
            "step",
            [
                FixtureReply::unavailable(),
                FixtureReply::unavailable(),
                FixtureReply::text("third time lucky"),
            ],
        );
        let client = client(fixture, base);

        let start = Instant::now();
        let response = client
            .generate(GenerateRequest::new("write").tag("step"))
            .await
            .unwrap();

        assert_eq!(response.content, "third time lucky");
        assert_eq!(response.provider_id, "fixture");
        assert!(start.elapsed() >= base + base * 2);
    }

    #[tokio::test]
    async fn test_exhaustion_is_generation_failed() {
        let fixture = FixtureProvider::new().script("step", [FixtureReply::unavailable()]);
        let client = client(fixture, Duration::from_millis(1));

        let err = client
            .generate(GenerateRequest::new("write").tag("step"))
            .await
            .unwrap_err();
        match err {
            SeoError::GenerationFailed {
                provider,
                attempts,
                last_error,
            } => {
                assert_eq!(provider, "fixture");
                assert_eq!(attempts, 3);
                assert!(last_error.contains("503"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let fixture = FixtureProvider::new().script(
            "step",
            [FixtureReply::Failure {
                status: 401,
                body: "bad key".to_string(),
            }],
        );
        let client = client(fixture, Duration::from_millis(1));

        let err = client
            .generate(GenerateRequest::new("write").tag("step"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(401));
        if let Provider::Fixture(f) = client.provider() {
            assert_eq!(f.calls("step"), 1);
        }
    }

    #[tokio::test]
    async fn test_input_validation() {
        let client = client(FixtureProvider::new(), Duration::ZERO);

        for request in [
            GenerateRequest::new("   "),
            GenerateRequest::new("ok").temperature(2.5),
            GenerateRequest::new("ok").temperature(-0.1),
            GenerateRequest::new("ok").max_tokens(0),
        ] {
            let err = client.generate(request).await.unwrap_err();
            assert!(matches!(err, SeoError::InvalidInput(_)));
        }
    }

    #[tokio::test]
    async fn test_generate_structured() {
        let fixture = FixtureProvider::new().script(
            "list",
            [FixtureReply::text("```json\n[\"seo\", \"local\"]\n```")],
        );
        let client = client(fixture, Duration::ZERO);
        let items: Vec<String> = client
            .generate_structured(GenerateRequest::new("list").tag("list"))
            .await
            .unwrap();
        assert_eq!(items, vec!["seo", "local"]);
    }
}
