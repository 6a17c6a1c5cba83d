use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
#[non_exhaustive]
pub enum Error {
    #[error("unknown queue {0:?}")]
    UnknownQueue(String),

    #[error("broker message {0} not found (already acked or expired)")]
    NotFound(String),

    #[error("broker backend error: {0}")]
    Backend(String),
}

impl Error {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Backend(_))
    }
}
