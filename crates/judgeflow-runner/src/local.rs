use crate::runner::{RunResult, SandboxRunner};
use crate::{Error, Language};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

/// Runs submitted/generator/reference code as a plain local subprocess,
/// one scratch directory per run. Adapts the timeout-and-kill idiom of
/// `shipper-process`'s `run_command_with_timeout` to `tokio::process`
/// instead of blocking on `std::process` + a manual poll loop.
///
/// This is not a sandbox: it provides no namespace, cgroup, or network
/// isolation. A production deployment places a real sandbox (gVisor,
/// firecracker, a container runtime) behind the same `SandboxRunner`
/// trait; this implementation is the local/dev-friendly default.
pub struct LocalProcessRunner {
    workspace_root: std::path::PathBuf,
}

impl LocalProcessRunner {
    /// Runs use the platform temp directory as their scratch root.
    pub fn new() -> Self {
        Self { workspace_root: std::env::temp_dir() }
    }

    pub fn with_workspace_root(workspace_root: impl Into<std::path::PathBuf>) -> Self {
        Self { workspace_root: workspace_root.into() }
    }

    fn prepare_workspace(&self, language: Language, code: &str) -> Result<(TempDir, std::path::PathBuf), Error> {
        let dir = tempfile::Builder::new().prefix("judgeflow-run-").tempdir_in(&self.workspace_root).map_err(Error::Workspace)?;
        let source_path = dir.path().join(format!("solution.{}", language.source_extension()));
        std::fs::write(&source_path, code).map_err(Error::Workspace)?;
        Ok((dir, source_path))
    }

    /// Builds the command that runs (and, for compiled languages, first
    /// compiles) the submitted code. Compilation failures are surfaced as
    /// an ordinary non-zero-exit `RunResult`, not an `Error` — a bad
    /// submission is an expected outcome, not a runner malfunction.
    async fn build_runnable(&self, dir: &TempDir, language: Language, source_path: &std::path::Path) -> Result<Option<Command>, Error> {
        match language {
            Language::Python => {
                let mut cmd = Command::new("python3");
                cmd.arg(source_path);
                Ok(Some(cmd))
            }
            Language::Cpp => {
                let binary_path = dir.path().join("solution");
                let compile = Command::new("g++")
                    .args(["-O2", "-std=c++17", "-o"])
                    .arg(&binary_path)
                    .arg(source_path)
                    .stdin(Stdio::null())
                    .stdout(Stdio::piped())
                    .stderr(Stdio::piped())
                    .output()
                    .await
                    .map_err(Error::Spawn)?;
                if !compile.status.success() {
                    return Ok(None);
                }
                let mut cmd = Command::new(&binary_path);
                cmd.current_dir(dir.path());
                Ok(Some(cmd))
            }
        }
    }
}

impl Default for LocalProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SandboxRunner for LocalProcessRunner {
    async fn run(&self, code: &str, language: Language, stdin: &str, timeout: Duration, memory_limit_mb: Option<u64>) -> Result<RunResult, Error> {
        if let Some(mb) = memory_limit_mb {
            tracing::debug!(mb, "memory limit is advisory only for the local process runner");
        }

        let start = Instant::now();
        let (dir, source_path) = self.prepare_workspace(language, code)?;

        let mut cmd = match self.build_runnable(&dir, language, &source_path).await? {
            Some(cmd) => cmd,
            None => {
                return Ok(RunResult {
                    stdout: String::new(),
                    stderr: "compilation failed".to_string(),
                    exit_code: -1,
                    timed_out: false,
                    duration: start.elapsed(),
                });
            }
        };

        let mut child = cmd.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::piped()).kill_on_drop(true).spawn().map_err(Error::Spawn)?;

        if let Some(mut child_stdin) = child.stdin.take() {
            let _ = child_stdin.write_all(stdin.as_bytes()).await;
        }

        let mut stdout_pipe = child.stdout.take().expect("stdout was piped");
        let mut stderr_pipe = child.stderr.take().expect("stderr was piped");
        let stdout_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stdout_pipe.read_to_end(&mut buf).await;
            buf
        });
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr_pipe.read_to_end(&mut buf).await;
            buf
        });

        let (exit_code, timed_out) = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(status) => (status.map_err(Error::Io)?.code().unwrap_or(-1), false),
            Err(_elapsed) => {
                let _ = child.kill().await;
                let _ = child.wait().await;
                (-1, true)
            }
        };

        let stdout_bytes = stdout_task.await.unwrap_or_default();
        let stderr_bytes = stderr_task.await.unwrap_or_default();
        let mut stderr = String::from_utf8_lossy(&stderr_bytes).into_owned();
        if timed_out {
            stderr.push_str(&format!("\nrun timed out after {}ms", timeout.as_millis()));
        }

        Ok(RunResult { stdout: String::from_utf8_lossy(&stdout_bytes).into_owned(), stderr, exit_code, timed_out, duration: start.elapsed() })
    }
}
