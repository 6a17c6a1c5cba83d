use thiserror::Error as ThisError;

/// §4.11-style LLM error taxonomy: schema failures are never retried
/// on the same provider, the rest are transient.
#[derive(Debug, ThisError)]
#[non_exhaustive]
pub enum Error {
    #[error("llm request to {provider} timed out")]
    Timeout { provider: String },

    #[error("llm request to {provider} failed: {message}")]
    Network { provider: String, message: String },

    #[error("llm provider {provider} refused or exhausted quota: {message}")]
    Provider { provider: String, message: String },

    #[error("llm response from {provider} failed schema validation: {message}")]
    Schema { provider: String, message: String },

    #[error("unknown llm provider {0:?}")]
    UnknownProvider(String),
}

impl Error {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Timeout { .. } | Error::Network { .. } | Error::Provider { .. })
    }
}
