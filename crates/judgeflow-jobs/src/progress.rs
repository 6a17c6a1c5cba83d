use crate::Error;
use judgeflow_store::repo::JobProgressRepository;
use judgeflow_types::{JobKind, JobProgress, ProgressStatus};
use std::sync::Arc;

/// Thin façade over the store's progress repository: callers go through
/// here so every append also gets a debug log line (§5 wants progress
/// rows mirrored into worker logs).
pub struct ProgressTracker {
    repo: Arc<JobProgressRepository>,
}

impl ProgressTracker {
    pub fn new(repo: Arc<JobProgressRepository>) -> Self {
        Self { repo }
    }

    pub async fn record(&self, job_kind: JobKind, job_id: &str, step: &str, message: &str, status: ProgressStatus, now: i64) -> Result<(), Error> {
        let progress = JobProgress {
            job_kind,
            job_id: job_id.to_string(),
            step: step.to_string(),
            message: message.to_string(),
            status,
            crt: now,
        };
        tracing::debug!(job_kind = job_kind.as_str(), job_id, step, ?status, "job progress");
        self.repo.append(&progress).await?;
        Ok(())
    }

    pub async fn history(&self, job_kind: JobKind, job_id: &str) -> Result<Vec<JobProgress>, Error> {
        let page = self.repo.list(job_kind.as_str(), job_id, usize::MAX).await?;
        Ok(page.items)
    }

    pub async fn clear(&self, job_kind: JobKind, job_id: &str) -> Result<(), Error> {
        self.repo.delete_all(job_kind.as_str(), job_id).await?;
        Ok(())
    }
}
