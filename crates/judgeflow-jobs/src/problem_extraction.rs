use crate::progress::ProgressTracker;
use crate::Error;
use judgeflow_store::repo::ProblemExtractionJobRepository;
use judgeflow_store::Page;
use judgeflow_types::{JobKind, JobStatus, ProblemExtractionJob, ProgressStatus};
use std::sync::Arc;

/// Problem-extraction job lifecycle (§4.6), mirroring
/// `ScriptGenerationJobService`'s FSM enforcement for the other job kind.
pub struct ProblemExtractionJobService {
    repo: Arc<ProblemExtractionJobRepository>,
    progress: Arc<ProgressTracker>,
}

impl ProblemExtractionJobService {
    pub fn new(repo: Arc<ProblemExtractionJobRepository>, progress: Arc<ProgressTracker>) -> Self {
        Self { repo, progress }
    }

    pub async fn create(&self, job: &ProblemExtractionJob, now: i64) -> Result<(), Error> {
        self.repo.create(job, now).await?;
        self.progress.record(JobKind::ProblemExtraction, &job.job_id, "queued", "job created", ProgressStatus::Started, now).await
    }

    pub async fn get(&self, job_id: &str) -> Result<Option<ProblemExtractionJob>, Error> {
        Ok(self.repo.get(job_id).await?)
    }

    pub async fn list_by_status(&self, status: JobStatus, cursor: Option<String>, limit: usize) -> Result<Page<ProblemExtractionJob>, Error> {
        Ok(self.repo.list_by_status(status, cursor, limit).await?)
    }

    async fn advance(&self, mut job: ProblemExtractionJob, next: JobStatus, step: &str, message: &str, now: i64) -> Result<ProblemExtractionJob, Error> {
        if !job.status.can_transition_to(next) {
            return Err(Error::IllegalTransition { job_id: job.job_id, current: job.status });
        }
        let expected_current = job.status;
        job.status = next;
        self.repo.transition(&job, expected_current, now).await?;
        let progress_status = if next.is_terminal() { ProgressStatus::Completed } else { ProgressStatus::InProgress };
        self.progress.record(JobKind::ProblemExtraction, &job.job_id, step, message, progress_status, now).await?;
        Ok(job)
    }

    pub async fn start(&self, job: ProblemExtractionJob, broker_task_id: &str, now: i64) -> Result<ProblemExtractionJob, Error> {
        let mut job = job;
        job.broker_task_id = Some(broker_task_id.to_string());
        self.advance(job, JobStatus::Processing, "started", "worker picked up job", now).await
    }

    pub async fn complete(&self, job: ProblemExtractionJob, now: i64) -> Result<ProblemExtractionJob, Error> {
        self.advance(job, JobStatus::Completed, "completed", "problem extracted", now).await
    }

    pub async fn fail(&self, job: ProblemExtractionJob, reason: String, now: i64) -> Result<ProblemExtractionJob, Error> {
        let mut job = job;
        job.error = Some(reason.clone());
        self.advance(job, JobStatus::Failed, "failed", &reason, now).await
    }

    pub async fn delete(&self, job_id: &str, now: i64) -> Result<(), Error> {
        self.progress.clear(JobKind::ProblemExtraction, job_id).await?;
        self.repo.delete(job_id).await?;
        tracing::info!(job_id, at = now, "problem extraction job deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use judgeflow_store::repo::JobProgressRepository;
    use judgeflow_store::InMemoryStore;

    fn job(id: &str) -> ProblemExtractionJob {
        ProblemExtractionJob {
            job_id: id.into(),
            platform: "codeforces".into(),
            url: "https://example.com/1".into(),
            problem_identifier: "1A".into(),
            status: JobStatus::Pending,
            broker_task_id: None,
            error: None,
        }
    }

    fn service() -> ProblemExtractionJobService {
        let store = Arc::new(InMemoryStore::new());
        ProblemExtractionJobService::new(
            Arc::new(ProblemExtractionJobRepository::new(store.clone())),
            Arc::new(ProgressTracker::new(Arc::new(JobProgressRepository::new(store)))),
        )
    }

    #[tokio::test]
    async fn failure_path_requires_processing_state() {
        let svc = service();
        svc.create(&job("j1"), 1).await.unwrap();
        let j = svc.get("j1").await.unwrap().unwrap();
        let j = svc.start(j, "broker-1", 2).await.unwrap();
        let j = svc.fail(j, "rate limited by platform".into(), 3).await.unwrap();
        assert_eq!(j.status, JobStatus::Failed);
        assert_eq!(j.error.as_deref(), Some("rate limited by platform"));
    }

    #[tokio::test]
    async fn racing_worker_transition_is_rejected() {
        let svc = service();
        svc.create(&job("j1"), 1).await.unwrap();
        let j = svc.get("j1").await.unwrap().unwrap();
        let j = svc.start(j, "broker-1", 2).await.unwrap();
        svc.complete(j.clone(), 3).await.unwrap();

        let err = svc.complete(j, 4).await.unwrap_err();
        assert!(matches!(err, Error::Store(judgeflow_store::Error::PreconditionFailed { .. })));
    }
}
