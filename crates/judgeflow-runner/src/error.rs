/// Errors from a sandbox runner invocation (§4.9's `run` capability).
///
/// A timed-out or non-zero-exit run is not an `Error` — it is a normal
/// `RunResult` the caller inspects. `Error` is reserved for the runner
/// itself failing to produce a result at all.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("failed to prepare sandbox workspace: {0}")]
    Workspace(#[source] std::io::Error),

    #[error("failed to spawn runner process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("failed to communicate with runner process: {0}")]
    Io(#[source] std::io::Error),
}

impl Error {
    /// Whether a caller could reasonably retry the same run. Spawn/IO
    /// failures are host-local hiccups (hit a process limit, pipe broke);
    /// an unsupported language or an unwritable workspace will not resolve
    /// by retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Spawn(_) | Error::Io(_))
    }
}
