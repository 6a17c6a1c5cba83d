use crate::{Error, Language};
use async_trait::async_trait;
use std::time::Duration;

/// Result of one sandboxed execution. A non-zero `exit_code` or
/// `timed_out == true` is not an `Error` — the caller (judgeflow-tasks)
/// decides what a given exit status means for the case at hand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub timed_out: bool,
    pub duration: Duration,
}

impl RunResult {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == 0
    }
}

/// Sandboxed code-execution capability (§4.9): `run(code, language,
/// stdin, timeout, memory) -> RunResult`. Internals of the sandbox
/// (containerization, resource cgroups) are an external concern; this
/// trait is the seam judgeflow-tasks programs against.
#[async_trait]
pub trait SandboxRunner: Send + Sync {
    async fn run(&self, code: &str, language: Language, stdin: &str, timeout: Duration, memory_limit_mb: Option<u64>) -> Result<RunResult, Error>;
}
