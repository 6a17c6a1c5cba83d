use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Broker(#[from] judgeflow_broker::Error),

    #[error("no task handler registered for {0:?}")]
    UnknownTask(String),
}

impl Error {
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Broker(e) => e.is_retryable(),
            Error::UnknownTask(_) => false,
        }
    }
}
