use crate::provider::LlmProvider;
use crate::request::{ChatMessage, CompletionRequest, CompletionResponse, ResponseFormat};
use crate::Error;
use judgeflow_config::LlmConfig;
use judgeflow_retry::{retry_async, Backoff};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Metadata the extraction task asks the LLM to produce from a scraped
/// problem page (§4.8's `extract_metadata`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub title: String,
    pub tags: Vec<String>,
    pub constraints: String,
}

/// Provider-abstracted LLM gateway (§4.8). Holds every configured
/// provider and applies the retry policy uniformly regardless of which one
/// a caller selects.
pub struct LlmGateway {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    backoff: Backoff,
}

impl LlmGateway {
    pub fn new(providers: Vec<Arc<dyn LlmProvider>>) -> Self {
        let providers = providers.into_iter().map(|p| (p.name().to_string(), p)).collect();
        Self { providers, backoff: Backoff::llm_gateway() }
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    fn provider(&self, name: &str) -> Result<&Arc<dyn LlmProvider>, Error> {
        self.providers.get(name).ok_or_else(|| Error::UnknownProvider(name.to_string()))
    }

    /// Runs one completion with the §4.8 retry policy: 3 attempts,
    /// exponential backoff, schema failures never retried.
    async fn complete_with_retry(&self, provider_name: &str, request: CompletionRequest) -> Result<CompletionResponse, Error> {
        let provider = self.provider(provider_name)?.clone();
        retry_async(
            &self.backoff,
            |e: &Error| e.is_retryable(),
            |attempt| {
                let provider = provider.clone();
                let request = &request;
                async move {
                    let result = provider.complete(request).await;
                    if let Err(e) = &result {
                        tracing::warn!(provider = provider_name, attempt, error = %e, "llm call failed");
                    }
                    result
                }
            },
        )
        .await
    }

    /// `generate(prompt, opts) -> Text` (§4.8).
    pub async fn generate(&self, provider_name: &str, model: &str, prompt: &str, config: &LlmConfig) -> Result<String, Error> {
        let request = CompletionRequest::deterministic(model, vec![ChatMessage::user(prompt)], None, config);
        let response = self.complete_with_retry(provider_name, request).await?;
        Ok(response.text)
    }

    /// `extract_metadata(url, hints) -> Metadata` (§4.8). The caller
    /// has already fetched the page; `page_text` is its scraped content.
    pub async fn extract_metadata(&self, provider_name: &str, model: &str, page_text: &str, hints: &[String], config: &LlmConfig) -> Result<Metadata, Error> {
        let system = ChatMessage::system(
            "Extract competitive programming problem metadata as JSON with fields \
             {title, tags, constraints}. Respond with JSON only.",
        );
        let mut prompt = format!("Page content:\n{page_text}");
        if !hints.is_empty() {
            prompt.push_str(&format!("\n\nHints:\n{}", hints.join("\n")));
        }
        let request = CompletionRequest::deterministic(model, vec![system, ChatMessage::user(prompt)], Some(ResponseFormat::Json), config);
        let response = self.complete_with_retry(provider_name, request).await?;

        serde_json::from_str(&response.text).map_err(|e| Error::Schema { provider: provider_name.to_string(), message: e.to_string() })
    }
}
