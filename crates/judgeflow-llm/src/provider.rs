use crate::request::{CompletionRequest, CompletionResponse};
use crate::Error;
use async_trait::async_trait;

/// A single LLM backend (§4.8 "multi-provider"). Implementors share
/// the same request/response schema so callers stay provider-agnostic.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, Error>;
}
