#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("gzip error: {0}")]
    Compression(#[from] std::io::Error),

    #[error("manifest serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("object store backend error: {0}")]
    Backend(String),
}

impl Error {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Backend(_))
    }
}
