use crate::progress::ProgressTracker;
use crate::Error;
use judgeflow_store::repo::ScriptGenerationJobRepository;
use judgeflow_store::Page;
use judgeflow_types::{JobKind, JobStatus, ProgressStatus, ScriptGenerationJob};
use std::sync::Arc;

/// Script-generation job lifecycle (§4.6): enforces the
/// `JobStatus` FSM around the store's conditional transition and appends a
/// matching progress row in the same logical step.
pub struct ScriptGenerationJobService {
    repo: Arc<ScriptGenerationJobRepository>,
    progress: Arc<ProgressTracker>,
}

impl ScriptGenerationJobService {
    pub fn new(repo: Arc<ScriptGenerationJobRepository>, progress: Arc<ProgressTracker>) -> Self {
        Self { repo, progress }
    }

    pub async fn create(&self, job: &ScriptGenerationJob, now: i64) -> Result<(), Error> {
        self.repo.create(job, now).await?;
        self.progress.record(JobKind::ScriptGeneration, &job.job_id, "queued", "job created", ProgressStatus::Started, now).await
    }

    pub async fn get(&self, job_id: &str) -> Result<Option<ScriptGenerationJob>, Error> {
        Ok(self.repo.get(job_id).await?)
    }

    pub async fn list_by_status(&self, status: JobStatus, cursor: Option<String>, limit: usize) -> Result<Page<ScriptGenerationJob>, Error> {
        Ok(self.repo.list_by_status(status, cursor, limit).await?)
    }

    /// Moves a job one step forward in the FSM, rejecting the move locally
    /// before it ever reaches the store if the edge isn't legal (§4.7
    /// enumerates the only legal edges).
    async fn advance(&self, mut job: ScriptGenerationJob, next: JobStatus, step: &str, message: &str, now: i64) -> Result<ScriptGenerationJob, Error> {
        if !job.status.can_transition_to(next) {
            return Err(Error::IllegalTransition { job_id: job.job_id, current: job.status });
        }
        let expected_current = job.status;
        job.status = next;
        self.repo.transition(&job, expected_current, now).await?;
        let progress_status = if next.is_terminal() { ProgressStatus::Completed } else { ProgressStatus::InProgress };
        self.progress.record(JobKind::ScriptGeneration, &job.job_id, step, message, progress_status, now).await?;
        Ok(job)
    }

    pub async fn start(&self, job: ScriptGenerationJob, broker_task_id: &str, now: i64) -> Result<ScriptGenerationJob, Error> {
        let mut job = job;
        job.broker_task_id = Some(broker_task_id.to_string());
        self.advance(job, JobStatus::Processing, "started", "worker picked up job", now).await
    }

    pub async fn complete(&self, job: ScriptGenerationJob, generator_code: String, now: i64) -> Result<ScriptGenerationJob, Error> {
        let mut job = job;
        job.generator_code = Some(generator_code);
        self.advance(job, JobStatus::Completed, "completed", "generator script produced", now).await
    }

    pub async fn fail(&self, job: ScriptGenerationJob, reason: String, now: i64) -> Result<ScriptGenerationJob, Error> {
        let mut job = job;
        job.error = Some(reason.clone());
        self.advance(job, JobStatus::Failed, "failed", &reason, now).await
    }

    pub async fn delete(&self, job_id: &str, now: i64) -> Result<(), Error> {
        self.progress.clear(JobKind::ScriptGeneration, job_id).await?;
        self.repo.delete(job_id).await?;
        tracing::info!(job_id, at = now, "script generation job deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use judgeflow_store::InMemoryStore;
    use judgeflow_store::repo::JobProgressRepository;

    fn job(id: &str) -> ScriptGenerationJob {
        ScriptGenerationJob {
            job_id: id.into(),
            platform: "baekjoon".into(),
            problem_id: "1000".into(),
            title: "A+B".into(),
            url: "https://example.com".into(),
            tags: vec![],
            language: "python".into(),
            constraints: String::new(),
            generator_code: None,
            status: JobStatus::Pending,
            broker_task_id: None,
            error: None,
        }
    }

    fn service() -> ScriptGenerationJobService {
        let store = Arc::new(InMemoryStore::new());
        ScriptGenerationJobService::new(
            Arc::new(ScriptGenerationJobRepository::new(store.clone())),
            Arc::new(ProgressTracker::new(Arc::new(JobProgressRepository::new(store)))),
        )
    }

    #[tokio::test]
    async fn happy_path_pending_to_processing_to_completed() {
        let svc = service();
        svc.create(&job("j1"), 1).await.unwrap();
        let j = svc.get("j1").await.unwrap().unwrap();
        let j = svc.start(j, "broker-1", 2).await.unwrap();
        assert_eq!(j.status, JobStatus::Processing);
        let j = svc.complete(j, "print(1)".into(), 3).await.unwrap();
        assert_eq!(j.status, JobStatus::Completed);
        assert_eq!(j.generator_code.as_deref(), Some("print(1)"));
    }

    #[tokio::test]
    async fn illegal_transition_is_rejected_before_touching_the_store() {
        let svc = service();
        svc.create(&job("j1"), 1).await.unwrap();
        let j = svc.get("j1").await.unwrap().unwrap();
        let err = svc.complete(j, "x".into(), 2).await.unwrap_err();
        assert!(matches!(err, Error::IllegalTransition { .. }));
    }

    #[tokio::test]
    async fn delete_clears_progress_and_the_job_row() {
        let svc = service();
        svc.create(&job("j1"), 1).await.unwrap();
        svc.delete("j1", 2).await.unwrap();
        assert!(svc.get("j1").await.unwrap().is_none());
    }
}
