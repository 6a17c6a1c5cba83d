use crate::provider::LlmProvider;
use crate::request::{CompletionRequest, CompletionResponse, Role, Usage};
use crate::Error;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic's Messages API, which splits the system prompt out of the
/// message list (unlike OpenAI's chat-completions shape).
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder().timeout(timeout).build().expect("reqwest client builds with a concrete timeout"),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn from_env(timeout: Duration) -> Self {
        Self::new(std::env::var("ANTHROPIC_API_KEY").unwrap_or_default(), timeout)
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    system: Option<&'a str>,
    messages: Vec<AnthropicMessage<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Default)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

/// Default cap when a caller doesn't separately bound output length;
/// the gateway's requests carry no explicit `max_tokens` field (§6
/// doesn't list one), so a generous fixed ceiling avoids truncation.
const DEFAULT_MAX_TOKENS: u32 = 4096;

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, Error> {
        if self.api_key.is_empty() {
            return Err(Error::Provider { provider: self.name().to_string(), message: "ANTHROPIC_API_KEY is not set".to_string() });
        }

        let system = request.messages.iter().find(|m| m.role == Role::System).map(|m| m.content.as_str());
        let messages: Vec<AnthropicMessage> = request
            .messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| AnthropicMessage { role: if m.role == Role::Assistant { "assistant" } else { "user" }, content: &m.content })
            .collect();

        let body = MessagesRequest {
            model: &request.model,
            system,
            messages,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: request.temperature,
            top_p: request.top_p,
        };

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout { provider: self.name().to_string() }
                } else {
                    Error::Network { provider: self.name().to_string(), message: e.to_string() }
                }
            })?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS || response.status().is_server_error() {
            return Err(Error::Provider { provider: self.name().to_string(), message: format!("status {}", response.status()) });
        }
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider { provider: self.name().to_string(), message: body });
        }

        let body: MessagesResponse = response.json().await.map_err(|e| Error::Schema { provider: self.name().to_string(), message: e.to_string() })?;
        let text = body
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| Error::Schema { provider: self.name().to_string(), message: "no text content block in response".to_string() })?;

        Ok(CompletionResponse {
            text,
            finish_reason: body.stop_reason.unwrap_or_else(|| "end_turn".to_string()),
            usage: Usage {
                prompt_tokens: body.usage.input_tokens,
                completion_tokens: body.usage.output_tokens,
                total_tokens: body.usage.input_tokens + body.usage.output_tokens,
            },
        })
    }
}
