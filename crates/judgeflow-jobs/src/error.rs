use judgeflow_types::JobStatus;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
#[non_exhaustive]
pub enum Error {
    #[error("job {job_id} is not in an allowed source state for this transition (at {current:?})")]
    IllegalTransition { job_id: String, current: JobStatus },

    #[error("job {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] judgeflow_store::Error),
}

impl Error {
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Store(e) => e.is_retryable(),
            Error::IllegalTransition { .. } | Error::NotFound(_) => false,
        }
    }
}
