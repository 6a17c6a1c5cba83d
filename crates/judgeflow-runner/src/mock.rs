use crate::runner::{RunResult, SandboxRunner};
use crate::{Error, Language};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Deterministic in-memory runner for tests: returns canned results in
/// order without spawning any process, matching the `MockProvider` /
/// `InMemoryBroker` test-double pattern used elsewhere in this workspace.
pub struct MockRunner {
    results: Mutex<Vec<Result<RunResult, Error>>>,
    calls: AtomicUsize,
}

impl MockRunner {
    pub fn new(results: Vec<Result<RunResult, Error>>) -> Self {
        Self { results: Mutex::new(results), calls: AtomicUsize::new(0) }
    }

    pub fn stdout(text: impl Into<String>) -> Self {
        Self::new(vec![Ok(RunResult { stdout: text.into(), stderr: String::new(), exit_code: 0, timed_out: false, duration: Duration::from_millis(1) })])
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SandboxRunner for MockRunner {
    async fn run(&self, _code: &str, _language: Language, _stdin: &str, _timeout: Duration, _memory_limit_mb: Option<u64>) -> Result<RunResult, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut results = self.results.lock().expect("mock runner mutex poisoned");
        if results.is_empty() {
            return Err(Error::Spawn(std::io::Error::new(std::io::ErrorKind::Other, "mock runner exhausted its canned results")));
        }
        results.remove(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_canned_results_in_order() {
        let runner = MockRunner::stdout("42");
        let result = runner.run("ignored", Language::Python, "", Duration::from_secs(1), None).await.unwrap();
        assert_eq!(result.stdout, "42");
        assert_eq!(runner.call_count(), 1);
    }
}
