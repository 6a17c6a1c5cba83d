/// Task library error kinds (§7's abstract kinds made concrete for C7).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("store error: {0}")]
    Store(#[from] judgeflow_store::Error),

    #[error("job service error: {0}")]
    Jobs(#[from] judgeflow_jobs::Error),

    #[error("testcase store error: {0}")]
    TestCases(#[from] judgeflow_testcases::Error),

    #[error("llm gateway error: {0}")]
    Llm(#[from] judgeflow_llm::Error),

    #[error("sandbox runner error: {0}")]
    Sandbox(#[from] judgeflow_runner::Error),

    #[error("broker error: {0}")]
    Broker(#[from] judgeflow_broker::Error),

    #[error("malformed stored payload: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("fetch error for {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl Error {
    /// Whether the worker pool should retry the task or treat it as
    /// terminal (mapped into `TaskOutcome` by each handler, not here,
    /// since a single error kind can mean different things to different
    /// tasks — e.g. `NotFound` is terminal for `ExecuteSubmission` but the
    /// caller-recoverable no-op for `RecoverOrphanedJobs`).
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Store(e) => e.is_retryable(),
            Error::Jobs(judgeflow_jobs::Error::Store(e)) => e.is_retryable(),
            Error::Jobs(_) => false,
            Error::TestCases(e) => e.is_retryable(),
            Error::Llm(e) => e.is_retryable(),
            Error::Sandbox(e) => e.is_retryable(),
            Error::Broker(e) => e.is_retryable(),
            Error::Fetch { .. } => true,
            Error::Serialization(_) | Error::Validation(_) | Error::NotFound(_) => false,
        }
    }
}
