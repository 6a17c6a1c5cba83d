/// Store error kinds (§4.1 "Error semantics", §7).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("item not found: {pk}/{sk}")]
    NotFound { pk: String, sk: String },

    #[error("precondition failed on {pk}/{sk}: {condition}")]
    PreconditionFailed { pk: String, sk: String, condition: String },

    #[error("store throttled: {0}")]
    Throttled(String),

    #[error("transient store failure: {0}")]
    Transient(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("backend error: {0}")]
    Backend(String),
}

impl Error {
    /// Whether a retry (per `judgeflow_retry::Backoff`) can plausibly
    /// change the outcome (§7 propagation policy).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Throttled(_) | Error::Transient(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttled_and_transient_are_retryable() {
        assert!(Error::Throttled("cap".into()).is_retryable());
        assert!(Error::Transient("net".into()).is_retryable());
    }

    #[test]
    fn not_found_and_precondition_failed_are_not_retryable() {
        assert!(!Error::NotFound { pk: "a".into(), sk: "b".into() }.is_retryable());
        assert!(!Error::PreconditionFailed {
            pk: "a".into(),
            sk: "b".into(),
            condition: "exists".into()
        }
        .is_retryable());
    }
}
