use crate::fetcher::WebpageFetcher;
use crate::Error;
use dashmap::DashMap;
use judgeflow_config::{LlmConfig, TaskRetryConfig};
use judgeflow_jobs::ProgressTracker;
use judgeflow_llm::LlmGateway;
use judgeflow_retry::{retry_async, Backoff};
use judgeflow_store::repo::ProblemRepository;
use judgeflow_types::{JobKind, JobStatus, Platform, Problem, ProgressStatus, TaskOutcome};
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// `ExtractProblem` (§4.6.1): fetch the source page, extract metadata via
/// the LLM gateway, and write a Problem draft. Per-platform concurrency is
/// capped by a semaphore so a burst of jobs for one source site doesn't
/// hammer it ("respect source-site politeness").
pub struct ExtractProblemTask {
    jobs: Arc<judgeflow_jobs::ProblemExtractionJobService>,
    problems: Arc<ProblemRepository>,
    progress: Arc<ProgressTracker>,
    fetcher: Arc<dyn WebpageFetcher>,
    llm: Arc<LlmGateway>,
    llm_provider: String,
    llm_config: LlmConfig,
    retry: TaskRetryConfig,
    fetch_backoff: Backoff,
    platform_permits: u32,
    semaphores: DashMap<String, Arc<Semaphore>>,
}

#[derive(Debug, Deserialize)]
struct Payload {
    job_id: String,
}

impl ExtractProblemTask {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        jobs: Arc<judgeflow_jobs::ProblemExtractionJobService>,
        problems: Arc<ProblemRepository>,
        progress: Arc<ProgressTracker>,
        fetcher: Arc<dyn WebpageFetcher>,
        llm: Arc<LlmGateway>,
        llm_provider: impl Into<String>,
        llm_config: LlmConfig,
        retry: TaskRetryConfig,
        platform_permits: u32,
    ) -> Self {
        Self {
            jobs,
            problems,
            progress,
            fetcher,
            llm,
            llm_provider: llm_provider.into(),
            llm_config,
            retry,
            fetch_backoff: Backoff::webpage_fetch(),
            platform_permits,
            semaphores: DashMap::new(),
        }
    }

    fn semaphore_for(&self, platform: &str) -> Arc<Semaphore> {
        self.semaphores.entry(platform.to_string()).or_insert_with(|| Arc::new(Semaphore::new(self.platform_permits as usize))).clone()
    }

    async fn run(&self, job_id: &str, now: i64) -> Result<TaskOutcome, Error> {
        let Some(job) = self.jobs.get(job_id).await? else {
            return Ok(TaskOutcome::Terminal(format!("problem extraction job {job_id} not found")));
        };
        if job.status.is_terminal() {
            return Ok(TaskOutcome::Success);
        }

        let job = if job.status == JobStatus::Pending { self.jobs.start(job, job_id, now).await? } else { job };

        let permit = self.semaphore_for(&job.platform).acquire_owned().await.expect("semaphore is never closed");
        let outcome = self.extract(&job.url, &job.platform, &job.problem_identifier, now).await;
        drop(permit);

        match outcome {
            Ok(problem) => {
                match self.problems.get(&job.platform, &job.problem_identifier).await? {
                    Some(_) => self.problems.update(&problem, now).await?,
                    None => self.problems.create(&problem, now).await?,
                }
                self.jobs.complete(job, now).await?;
                Ok(TaskOutcome::Success)
            }
            Err(e) => self.handle_failure(job, e, now).await,
        }
    }

    async fn extract(&self, url: &str, platform: &str, problem_identifier: &str, now: i64) -> Result<Problem, Error> {
        let platform = Platform::from_str(platform).map_err(|e| Error::Validation(e.to_string()))?;

        let html = retry_async(&self.fetch_backoff, |e: &Error| e.is_retryable(), |_attempt| self.fetcher.fetch(url)).await?;

        let metadata = self.llm.extract_metadata(&self.llm_provider, &self.llm_config.model, &html, &[], &self.llm_config).await?;

        let mut problem = Problem::new(platform, problem_identifier, url);
        problem.title = metadata.title;
        problem.tags = metadata.tags;
        problem.constraints = metadata.constraints;
        let _ = now;
        Ok(problem)
    }

    async fn handle_failure(&self, job: judgeflow_types::ProblemExtractionJob, error: Error, now: i64) -> Result<TaskOutcome, Error> {
        let history = self.progress.history(JobKind::ProblemExtraction, &job.job_id).await?;
        let prior_failures = history.iter().filter(|p| p.step == "extract_failed").count() as u32;
        let reason = error.to_string();

        if prior_failures + 1 >= self.retry.max_retries {
            self.jobs.fail(job, reason.clone(), now).await?;
            Ok(TaskOutcome::Terminal(reason))
        } else {
            self.progress.record(JobKind::ProblemExtraction, &job.job_id, "extract_failed", &reason, ProgressStatus::Failed, now).await?;
            Ok(TaskOutcome::Retry(reason))
        }
    }
}

#[async_trait::async_trait]
impl judgeflow_worker::TaskHandler for ExtractProblemTask {
    async fn handle(&self, payload: &serde_json::Value) -> TaskOutcome {
        let payload: Payload = match serde_json::from_value(payload.clone()) {
            Ok(p) => p,
            Err(e) => return TaskOutcome::Terminal(format!("malformed ExtractProblem payload: {e}")),
        };
        let now = crate::unix_now();
        match self.run(&payload.job_id, now).await {
            Ok(outcome) => outcome,
            Err(e) => TaskOutcome::Retry(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::MockFetcher;
    use judgeflow_jobs::{ProblemExtractionJobService, ProgressTracker};
    use judgeflow_llm::MockProvider;
    use judgeflow_store::repo::{JobProgressRepository, ProblemExtractionJobRepository};
    use judgeflow_store::InMemoryStore;
    use judgeflow_types::ProblemExtractionJob;
    use judgeflow_worker::TaskHandler;

    fn llm_config() -> LlmConfig {
        LlmConfig { model: "gpt-4o".into(), temperature: 0.0, reasoning_effort: "high".into(), verbosity: "low".into(), timeout_seconds: 60 }
    }

    fn task(provider: MockProvider, fetcher: MockFetcher) -> (ExtractProblemTask, Arc<ProblemExtractionJobService>) {
        let store = Arc::new(InMemoryStore::new());
        let progress = Arc::new(ProgressTracker::new(Arc::new(JobProgressRepository::new(store.clone()))));
        let jobs = Arc::new(ProblemExtractionJobService::new(Arc::new(ProblemExtractionJobRepository::new(store.clone())), progress.clone()));
        let problems = Arc::new(ProblemRepository::new(store));
        let llm = Arc::new(LlmGateway::new(vec![Arc::new(provider)]));
        let task = ExtractProblemTask::new(jobs.clone(), problems, progress, Arc::new(fetcher), llm, "mock", llm_config(), TaskRetryConfig::default(), 4);
        (task, jobs)
    }

    fn job() -> ProblemExtractionJob {
        ProblemExtractionJob {
            job_id: "j1".into(),
            platform: "baekjoon".into(),
            url: "https://example.com/1000".into(),
            problem_identifier: "1000".into(),
            status: JobStatus::Pending,
            broker_task_id: None,
            error: None,
        }
    }

    #[tokio::test]
    async fn extracts_metadata_and_completes_the_job() {
        let metadata = r#"{"title": "A+B", "tags": ["math"], "constraints": "1 <= a,b <= 1000"}"#;
        let provider = MockProvider::new("mock", vec![Ok(judgeflow_llm::CompletionResponse { text: metadata.into(), finish_reason: "stop".into(), usage: Default::default() })]);
        let fetcher = MockFetcher::new().with_page("https://example.com/1000", "<html>A+B problem</html>");
        let (task, jobs) = task(provider, fetcher);
        jobs.create(&job(), 1).await.unwrap();

        let outcome = task.handle(&serde_json::json!({"job_id": "j1"})).await;
        assert_eq!(outcome, TaskOutcome::Success);
        let j = jobs.get("j1").await.unwrap().unwrap();
        assert_eq!(j.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn unknown_job_id_is_terminal() {
        let (task, _jobs) = task(MockProvider::text("mock", "x"), MockFetcher::new());
        let outcome = task.handle(&serde_json::json!({"job_id": "missing"})).await;
        assert!(matches!(outcome, TaskOutcome::Terminal(_)));
    }

    #[tokio::test]
    async fn fetch_failure_retries_before_exhausting_attempts() {
        let (task, jobs) = task(MockProvider::text("mock", "x"), MockFetcher::new());
        jobs.create(&job(), 1).await.unwrap();
        let outcome = task.handle(&serde_json::json!({"job_id": "j1"})).await;
        assert!(matches!(outcome, TaskOutcome::Retry(_)));
        let j = jobs.get("j1").await.unwrap().unwrap();
        assert_eq!(j.status, JobStatus::Processing);
    }
}
