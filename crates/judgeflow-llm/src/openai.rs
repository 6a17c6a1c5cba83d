use crate::provider::LlmProvider;
use crate::request::{CompletionRequest, CompletionResponse, Usage};
use crate::Error;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible chat-completions provider. Reads its key from
/// `OPENAI_API_KEY` by default, matching the rest of this codebase's
/// provider crates (`dashflow-openai`, `dashflow-anthropic`).
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder().timeout(timeout).build().expect("reqwest client builds with a concrete timeout"),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn from_env(timeout: Duration) -> Self {
        Self::new(std::env::var("OPENAI_API_KEY").unwrap_or_default(), timeout)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize, Default)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, Error> {
        if self.api_key.is_empty() {
            return Err(Error::Provider { provider: self.name().to_string(), message: "OPENAI_API_KEY is not set".to_string() });
        }

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
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

        let body: ChatCompletionResponse = response.json().await.map_err(|e| Error::Schema { provider: self.name().to_string(), message: e.to_string() })?;

        let choice = body.choices.into_iter().next().ok_or_else(|| Error::Schema { provider: self.name().to_string(), message: "no choices in response".to_string() })?;
        let text = choice.message.content.ok_or_else(|| Error::Schema { provider: self.name().to_string(), message: "choice has no content".to_string() })?;
        let usage = body.usage.unwrap_or_default();

        Ok(CompletionResponse {
            text,
            finish_reason: choice.finish_reason.unwrap_or_else(|| "stop".to_string()),
            usage: Usage { prompt_tokens: usage.prompt_tokens, completion_tokens: usage.completion_tokens, total_tokens: usage.total_tokens },
        })
    }
}
