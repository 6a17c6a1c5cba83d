//! LLM gateway (§4.8): provider-abstracted completions with
//! deterministic sampling, reasoning-model handling, and uniform retry.

mod anthropic;
mod error;
mod gateway;
mod mock;
mod openai;
mod provider;
mod request;

pub use anthropic::AnthropicProvider;
pub use error::Error;
pub use gateway::{LlmGateway, Metadata};
pub use mock::MockProvider;
pub use openai::OpenAiProvider;
pub use provider::LlmProvider;
pub use request::{ChatMessage, CompletionRequest, CompletionResponse, ResponseFormat, Role, Usage};
