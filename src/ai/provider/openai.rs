//! OpenAI API Provider
//!
//! Chat Completions API. JSON requests set `response_format: json_object`.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    ProviderConfig, ProviderReply, ProviderRequest, TextProvider, TokenUsage, ensure_success,
    non_empty,
};
use crate::types::Result;

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// OpenAI API Provider with secure API key handling
pub struct OpenAiProvider {
    /// Never exposed in logs or debug output
    api_key: SecretString,
    api_base: String,
    model: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish()
    }
}

impl OpenAiProvider {
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

    fn build_request(&self, request: &ProviderRequest) -> ChatCompletionRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system_prompt {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });

        ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: request.temperature,
            max_tokens: Some(request.max_tokens),
            response_format: request.json.then(|| ResponseFormat {
                format_type: "json_object".to_string(),
            }),
        }
    }
}

#[async_trait]
impl TextProvider for OpenAiProvider {
    async fn generate(&self, request: &ProviderRequest) -> Result<ProviderReply> {
        let url = format!("{}/chat/completions", self.api_base.trim_end_matches('/'));
        debug!(model = %self.model, tag = ?request.tag, "Sending request to OpenAI API");

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&self.build_request(request))
            .send()
            .await?;

        let body: ChatCompletionResponse = ensure_success(self.name(), response).await?.json().await?;

        let usage = body
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens));
        let text = body.choices.into_iter().next().and_then(|c| c.message.content);

        Ok(ProviderReply {
            text: non_empty(self.name(), text)?,
            usage,
            model: body.model.unwrap_or_else(|| self.model.clone()),
        })
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<Choice>,
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageInfo {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::ProviderKind;
    use crate::types::SeoError;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> OpenAiProvider {
        OpenAiProvider::new(&ProviderConfig {
            kind: ProviderKind::OpenAi,
            api_key: Some("sk-test".to_string()),
            api_base: Some(server.uri()),
            ..ProviderConfig::default()
        })
        .unwrap()
    }

    fn request(json: bool) -> ProviderRequest {
        ProviderRequest {
            prompt: "Write a headline".to_string(),
            system_prompt: Some("You write landing pages".to_string()),
            temperature: 0.7,
            max_tokens: 256,
            json,
            tag: None,
        }
    }

    #[tokio::test]
    async fn test_generate_maps_reply_and_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "gpt-4o-mini",
                "choices": [{"message": {"content": "Fast sites for dentists"}}],
                "usage": {"prompt_tokens": 12, "completion_tokens": 5}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = provider(&server).generate(&request(false)).await.unwrap();
        assert_eq!(reply.text, "Fast sites for dentists");
        assert_eq!(reply.usage.unwrap().total(), 17);
    }

    #[test]
    fn test_json_request_sets_response_format() {
        let p = OpenAiProvider::new(&ProviderConfig {
            kind: ProviderKind::OpenAi,
            api_key: Some("sk-test".to_string()),
            ..ProviderConfig::default()
        })
        .unwrap();
        let body = serde_json::to_value(p.build_request(&request(true))).unwrap();
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["role"], "system");

        let body = serde_json::to_value(p.build_request(&request(false))).unwrap();
        assert!(body.get("response_format").is_none());
    }

    #[tokio::test]
    async fn test_non_success_keeps_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let err = provider(&server).generate(&request(false)).await.unwrap_err();
        match &err {
            SeoError::ProviderApi { status, body, .. } => {
                assert_eq!(*status, 429);
                assert_eq!(body, "slow down");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.is_retryable());
    }
}
