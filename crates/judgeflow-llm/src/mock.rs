use crate::provider::LlmProvider;
use crate::request::{CompletionRequest, CompletionResponse, Usage};
use crate::Error;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Deterministic in-memory provider for tests: returns canned responses in
/// order, or a configured error, without making any network call.
pub struct MockProvider {
    name: String,
    responses: Mutex<Vec<Result<CompletionResponse, Error>>>,
    calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(name: impl Into<String>, responses: Vec<Result<CompletionResponse, Error>>) -> Self {
        Self { name: name.into(), responses: Mutex::new(responses), calls: AtomicUsize::new(0) }
    }

    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(
            name,
            vec![Ok(CompletionResponse { text: text.into(), finish_reason: "stop".to_string(), usage: Usage::default() })],
        )
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, _request: &CompletionRequest) -> Result<CompletionResponse, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut responses = self.responses.lock().expect("mock provider mutex poisoned");
        if responses.is_empty() {
            return Err(Error::Provider { provider: self.name.clone(), message: "mock provider exhausted its canned responses".to_string() });
        }
        responses.remove(0)
    }
}
