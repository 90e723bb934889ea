//! Anthropic API Provider
//!
//! Messages API with a single user turn and an optional system prompt.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    ProviderConfig, ProviderReply, ProviderRequest, TextProvider, TokenUsage, ensure_success,
    non_empty,
};
use crate::types::Result;

const DEFAULT_API_BASE: &str = "https://api.anthropic.com/v1";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const API_VERSION: &str = "2023-06-01";
const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

pub struct AnthropicProvider {
    api_key: SecretString,
    api_base: String,
    model: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for AnthropicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

impl AnthropicProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let api_key = config.resolve_api_key(API_KEY_ENV)?;

        Ok(Self {
            api_key: SecretString::from(api_key),
            api_base: config
                .api_base
                .clone()
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            client: config.http_client()?,
        })
    }

    fn build_request(&self, request: &ProviderRequest) -> MessagesRequest {
        MessagesRequest {
            model: self.model.clone(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: request.system_prompt.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: request.prompt.clone(),
            }],
        }
    }
}

#[async_trait]
impl TextProvider for AnthropicProvider {
    async fn generate(&self, request: &ProviderRequest) -> Result<ProviderReply> {
        let url = format!("{}/messages", self.api_base.trim_end_matches('/'));
        debug!(model = %self.model, tag = ?request.tag, "Sending request to Anthropic API");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
            .json(&self.build_request(request))
            .send()
            .await?;

        let body: MessagesResponse = ensure_success(self.name(), response).await?.json().await?;

        // Only text blocks carry content; concatenate them in order
        let text: String = body
            .content
            .iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text.as_deref())
            .collect();

        Ok(ProviderReply {
            text: non_empty(self.name(), Some(text))?,
            usage: body
                .usage
                .map(|u| TokenUsage::new(u.input_tokens, u.output_tokens)),
            model: body.model.unwrap_or_else(|| self.model.clone()),
        })
    }

    fn name(&self) -> &str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    model: Option<String>,
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::ProviderKind;
    use crate::types::SeoError;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> AnthropicProvider {
        AnthropicProvider::new(&ProviderConfig {
            kind: ProviderKind::Anthropic,
            api_key: Some("ak-test".to_string()),
            api_base: Some(server.uri()),
            ..ProviderConfig::default()
        })
        .unwrap()
    }

    fn request() -> ProviderRequest {
        ProviderRequest {
            prompt: "List keywords".to_string(),
            system_prompt: None,
            temperature: 0.2,
            max_tokens: 128,
            json: true,
            tag: None,
        }
    }

    #[tokio::test]
    async fn test_generate_concatenates_text_blocks() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "ak-test"))
            .and(header("anthropic-version", API_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "claude-test",
                "content": [
                    {"type": "text", "text": "[\"a\", "},
                    {"type": "text", "text": "\"b\"]"}
                ],
                "usage": {"input_tokens": 3, "output_tokens": 4}
            })))
            .mount(&server)
            .await;

        let reply = provider(&server).generate(&request()).await.unwrap();
        assert_eq!(reply.text, "[\"a\", \"b\"]");
        assert_eq!(reply.model, "claude-test");
        assert_eq!(reply.usage, Some(TokenUsage::new(3, 4)));
    }

    #[tokio::test]
    async fn test_empty_content_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": []})))
            .mount(&server)
            .await;

        let err = provider(&server).generate(&request()).await.unwrap_err();
        assert!(matches!(err, SeoError::MalformedResponse { .. }));
    }

    #[test]
    fn test_debug_redacts_key() {
        let p = AnthropicProvider::new(&ProviderConfig {
            api_key: Some("ak-secret-value".to_string()),
            ..ProviderConfig::default()
        })
        .unwrap();
        assert!(!format!("{:?}", p).contains("ak-secret-value"));
    }
}
