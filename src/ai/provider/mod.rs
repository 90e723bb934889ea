//! Text Generation Providers
//!
//! A closed set of backends behind one interface. The backend is chosen once,
//! when [`Provider::from_config`] runs; call sites never branch on provider
//! names.
//!
//! ## Backends
//!
//! - `anthropic`: Messages API
//! - `openai`: Chat Completions API
//! - `gemini`: `generateContent` API
//! - `fixture`: scripted replies keyed by request tag (offline runs, tests)

mod anthropic;
mod fixture;
mod gemini;
mod openai;

pub use anthropic::AnthropicProvider;
pub use fixture::{FixtureProvider, FixtureReply};
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ai::timeout::TimeoutConfig;
use crate::types::{Result, SeoError};

// =============================================================================
// Provider Kind
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Anthropic,
    OpenAi,
    Gemini,
    Fixture,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Fixture => "fixture",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "openai" => Ok(ProviderKind::OpenAi),
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            "fixture" | "mock" => Ok(ProviderKind::Fixture),
            _ => Err(format!(
                "Unknown provider: {}. Supported: anthropic, openai, gemini, fixture",
                s
            )),
        }
    }
}

// =============================================================================
// Request / Reply
// =============================================================================

/// One fully-resolved generation request as seen by a backend
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the backend for a JSON body when it supports a response format
    pub json: bool,
    /// Request tag; only the fixture backend looks at it
    pub tag: Option<String>,
}

/// Token usage reported by a provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl TokenUsage {
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Raw backend reply
#[derive(Debug, Clone)]
pub struct ProviderReply {
    pub text: String,
    pub usage: Option<TokenUsage>,
    pub model: String,
}

// =============================================================================
// Provider Configuration
// =============================================================================

/// Configuration for generation providers
///
/// The API key is never serialized and is redacted in debug output. Each
/// backend converts it to a `SecretString` at construction.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    /// Model name (backend default when unset)
    pub model: Option<String>,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// Base URL override (proxies, tests)
    #[serde(default)]
    pub api_base: Option<String>,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            model: None,
            api_key: None,
            api_base: None,
            timeout_secs: crate::constants::network::LLM_TIMEOUT_SECS,
        }
    }
}

impl ProviderConfig {
    fn http_client(&self) -> Result<reqwest::Client> {
        TimeoutConfig {
            llm_request: Duration::from_secs(self.timeout_secs),
            ..TimeoutConfig::default()
        }
        .llm_client()
    }

    /// Resolve the API key from config, then from the backend's env var
    fn resolve_api_key(&self, env_var: &str) -> Result<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(env_var).ok())
            .ok_or_else(|| {
                SeoError::Config(format!(
                    "{} API key not found. Set {} or llm.api_key in config",
                    self.kind, env_var
                ))
            })
    }
}

// =============================================================================
// Provider Trait
// =============================================================================

/// Interface every backend implements
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// One generation attempt; retries are the caller's business
    async fn generate(&self, request: &ProviderRequest) -> Result<ProviderReply>;

    /// Provider name for logging and results
    fn name(&self) -> &str;

    /// Model name currently in use
    fn model(&self) -> &str;
}

/// The configured backend
#[derive(Debug)]
pub enum Provider {
    Anthropic(AnthropicProvider),
    OpenAi(OpenAiProvider),
    Gemini(GeminiProvider),
    Fixture(FixtureProvider),
}

impl Provider {
    /// Build the backend named by `config.kind`
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        Ok(match config.kind {
            ProviderKind::Anthropic => Provider::Anthropic(AnthropicProvider::new(config)?),
            ProviderKind::OpenAi => Provider::OpenAi(OpenAiProvider::new(config)?),
            ProviderKind::Gemini => Provider::Gemini(GeminiProvider::new(config)?),
            ProviderKind::Fixture => Provider::Fixture(FixtureProvider::landing_page_defaults()),
        })
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Provider::Anthropic(_) => ProviderKind::Anthropic,
            Provider::OpenAi(_) => ProviderKind::OpenAi,
            Provider::Gemini(_) => ProviderKind::Gemini,
            Provider::Fixture(_) => ProviderKind::Fixture,
        }
    }

    fn inner(&self) -> &dyn TextProvider {
        match self {
            Provider::Anthropic(p) => p,
            Provider::OpenAi(p) => p,
            Provider::Gemini(p) => p,
            Provider::Fixture(p) => p,
        }
    }

    /// Send a tiny request and report whether anything came back
    pub async fn test_connection(&self) -> bool {
        let request = ProviderRequest {
            prompt: "Test connection. Respond with: OK".to_string(),
            system_prompt: None,
            temperature: 0.0,
            max_tokens: 10,
            json: false,
            tag: Some(crate::constants::tags::CONNECTION_TEST.to_string()),
        };
        match self.generate(&request).await {
            Ok(reply) => !reply.text.trim().is_empty(),
            Err(e) => {
                tracing::warn!(provider = self.name(), error = %e, "Connection test failed");
                false
            }
        }
    }
}

#[async_trait]
impl TextProvider for Provider {
    async fn generate(&self, request: &ProviderRequest) -> Result<ProviderReply> {
        self.inner().generate(request).await
    }

    fn name(&self) -> &str {
        self.inner().name()
    }

    fn model(&self) -> &str {
        self.inner().model()
    }
}

/// Shared non-2xx handling for HTTP backends
pub(crate) async fn ensure_success(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SeoError::ProviderApi {
        provider: provider.to_string(),
        status: status.as_u16(),
        body,
    })
}

/// Reject a reply with no text in it
pub(crate) fn non_empty(provider: &str, text: Option<String>) -> Result<String> {
    match text {
        Some(t) if !t.trim().is_empty() => Ok(t),
        _ => Err(SeoError::malformed(
            format!("{} returned no text content", provider),
            "",
        )),
    }
}
