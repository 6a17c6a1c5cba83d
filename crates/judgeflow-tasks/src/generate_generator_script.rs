use crate::testcase_gen::{decode_reference_solution, generate_outputs, to_test_cases};
use crate::Error;
use judgeflow_config::{LlmConfig, TaskRetryConfig, TestCasesConfig};
use judgeflow_jobs::{ProgressTracker, ScriptGenerationJobService};
use judgeflow_llm::LlmGateway;
use judgeflow_runner::{Language, SandboxRunner};
use judgeflow_store::repo::ProblemRepository;
use judgeflow_testcases::TestCaseStore;
use judgeflow_types::{JobKind, JobStatus, ProgressStatus, ScriptGenerationJob, TaskOutcome};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// `GenerateGeneratorScript` (§4.6.2): ask the LLM for a generator program,
/// run it in the sandbox to produce inputs, validate each one against the
/// reference solution, and persist the resulting test-case manifest.
///
/// The generator's stdout is expected to be a JSON array of input strings;
/// this is not specified by the wire formats in §6, so it is fixed here as
/// the one deterministic contract between the LLM prompt and the sandbox
/// run (an Open Question decision, see DESIGN.md).
pub struct GenerateGeneratorScriptTask {
    jobs: Arc<ScriptGenerationJobService>,
    problems: Arc<ProblemRepository>,
    testcases: Arc<TestCaseStore>,
    progress: Arc<ProgressTracker>,
    runner: Arc<dyn SandboxRunner>,
    llm: Arc<LlmGateway>,
    llm_provider: String,
    llm_config: LlmConfig,
    testcases_config: TestCasesConfig,
    retry: TaskRetryConfig,
    run_timeout: Duration,
    concurrency: usize,
}

#[derive(Debug, Deserialize)]
struct Payload {
    job_id: String,
}

impl GenerateGeneratorScriptTask {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        jobs: Arc<ScriptGenerationJobService>,
        problems: Arc<ProblemRepository>,
        testcases: Arc<TestCaseStore>,
        progress: Arc<ProgressTracker>,
        runner: Arc<dyn SandboxRunner>,
        llm: Arc<LlmGateway>,
        llm_provider: impl Into<String>,
        llm_config: LlmConfig,
        testcases_config: TestCasesConfig,
        retry: TaskRetryConfig,
        run_timeout: Duration,
        concurrency: usize,
    ) -> Self {
        Self {
            jobs,
            problems,
            testcases,
            progress,
            runner,
            llm,
            llm_provider: llm_provider.into(),
            llm_config,
            testcases_config,
            retry,
            run_timeout,
            concurrency,
        }
    }

    async fn run(&self, job_id: &str, now: i64) -> Result<TaskOutcome, Error> {
        let Some(job) = self.jobs.get(job_id).await? else {
            return Ok(TaskOutcome::Terminal(format!("script generation job {job_id} not found")));
        };
        if job.status.is_terminal() {
            return Ok(TaskOutcome::Success);
        }
        let job = if job.status == JobStatus::Pending { self.jobs.start(job, job_id, now).await? } else { job };

        match self.generate(&job, now).await {
            Ok(generator_code) => {
                self.jobs.complete(job, generator_code, now).await?;
                Ok(TaskOutcome::Success)
            }
            Err(e) => self.handle_failure(job, e, now).await,
        }
    }

    async fn generate(&self, job: &ScriptGenerationJob, now: i64) -> Result<String, Error> {
        let language = Language::parse(&job.language)?;

        let problem = self
            .problems
            .get(&job.platform, &job.problem_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("problem {}#{} for job {}", job.platform, job.problem_id, job.job_id)))?;
        let reference_code = decode_reference_solution(&problem.reference_solution_b64)?;

        let count = self.testcases_config.max_count;
        let prompt = format!(
            "Write a {} program that prints a JSON array of exactly {count} distinct, valid \
             test inputs for the following problem, to stdout, and nothing else.\n\n\
             Title: {}\nConstraints: {}\nTags: {}",
            job.language,
            job.title,
            job.constraints,
            job.tags.join(", "),
        );
        let generator_code = self.llm.generate(&self.llm_provider, &self.llm_config.model, &prompt, &self.llm_config).await?;

        let generator_output = self.runner.run(&generator_code, language, "", self.run_timeout, None).await?;
        if !generator_output.success() {
            return Err(Error::Validation(format!("generator script failed: {}", generator_output.stderr)));
        }
        let inputs: Vec<String> =
            serde_json::from_str(&generator_output.stdout).map_err(|e| Error::Validation(format!("generator did not print a JSON array of inputs: {e}")))?;

        let results = generate_outputs(self.runner.clone(), &reference_code, language, inputs, self.run_timeout, self.concurrency).await;
        let (cases, failures) = to_test_cases(results);

        let manifest = judgeflow_testcases::TestCaseManifest { cases };
        self.testcases.write(&job.platform, &job.problem_id, &manifest).await?;

        let mut problem = problem;
        problem.tcc = manifest.len();
        problem.completed = true;
        problem.needs_review = problem.needs_review || failures > 0;
        self.problems.update(&problem, now).await?;

        Ok(generator_code)
    }

    async fn handle_failure(&self, job: ScriptGenerationJob, error: Error, now: i64) -> Result<TaskOutcome, Error> {
        let history = self.progress.history(JobKind::ScriptGeneration, &job.job_id).await?;
        let prior_failures = history.iter().filter(|p| p.step == "generate_failed").count() as u32;
        let reason = error.to_string();

        if prior_failures + 1 >= self.retry.max_retries {
            self.jobs.fail(job, reason.clone(), now).await?;
            Ok(TaskOutcome::Terminal(reason))
        } else {
            self.progress.record(JobKind::ScriptGeneration, &job.job_id, "generate_failed", &reason, ProgressStatus::Failed, now).await?;
            Ok(TaskOutcome::Retry(reason))
        }
    }
}

#[async_trait::async_trait]
impl judgeflow_worker::TaskHandler for GenerateGeneratorScriptTask {
    async fn handle(&self, payload: &serde_json::Value) -> TaskOutcome {
        let payload: Payload = match serde_json::from_value(payload.clone()) {
            Ok(p) => p,
            Err(e) => return TaskOutcome::Terminal(format!("malformed GenerateGeneratorScript payload: {e}")),
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
    use judgeflow_jobs::{ProgressTracker, ScriptGenerationJobService};
    use judgeflow_llm::MockProvider;
    use judgeflow_runner::MockRunner;
    use judgeflow_store::repo::{JobProgressRepository, ScriptGenerationJobRepository};
    use judgeflow_store::InMemoryStore;
    use judgeflow_testcases::{InMemoryObjectStore, TestCaseStore};
    use judgeflow_types::{Platform, Problem};
    use judgeflow_worker::TaskHandler;

    fn llm_config() -> LlmConfig {
        LlmConfig { model: "gpt-4o".into(), temperature: 0.0, reasoning_effort: "high".into(), verbosity: "low".into(), timeout_seconds: 60 }
    }

    fn job(id: &str) -> ScriptGenerationJob {
        ScriptGenerationJob {
            job_id: id.into(),
            platform: "baekjoon".into(),
            problem_id: "1000".into(),
            title: "A+B".into(),
            url: "https://example.com".into(),
            tags: vec!["math".into()],
            language: "python".into(),
            constraints: "1 <= a,b <= 1000".into(),
            generator_code: None,
            status: JobStatus::Pending,
            broker_task_id: None,
            error: None,
        }
    }

    fn setup(runner: MockRunner, generation: &str) -> (GenerateGeneratorScriptTask, Arc<ScriptGenerationJobService>, Arc<ProblemRepository>) {
        let store = Arc::new(InMemoryStore::new());
        let progress = Arc::new(ProgressTracker::new(Arc::new(JobProgressRepository::new(store.clone()))));
        let jobs = Arc::new(ScriptGenerationJobService::new(Arc::new(ScriptGenerationJobRepository::new(store.clone())), progress.clone()));
        let problems = Arc::new(ProblemRepository::new(store));
        let testcases = Arc::new(TestCaseStore::new(Arc::new(InMemoryObjectStore::new()), 6));
        let llm = Arc::new(LlmGateway::new(vec![Arc::new(MockProvider::text("mock", generation))]));
        let task = GenerateGeneratorScriptTask::new(
            jobs.clone(),
            problems.clone(),
            testcases,
            progress,
            Arc::new(runner),
            llm,
            "mock",
            llm_config(),
            TestCasesConfig { max_count: 2, gzip_level: 6 },
            TaskRetryConfig::default(),
            Duration::from_secs(5),
            4,
        );
        (task, jobs, problems)
    }

    #[tokio::test]
    async fn generates_inputs_and_persists_test_cases() {
        let runner = MockRunner::new(vec![
            Ok(judgeflow_runner::RunResult { stdout: r#"["1 2", "3 4"]"#.into(), stderr: String::new(), exit_code: 0, timed_out: false, duration: Duration::from_millis(1) }),
            Ok(judgeflow_runner::RunResult { stdout: "3".into(), stderr: String::new(), exit_code: 0, timed_out: false, duration: Duration::from_millis(1) }),
            Ok(judgeflow_runner::RunResult { stdout: "7".into(), stderr: String::new(), exit_code: 0, timed_out: false, duration: Duration::from_millis(1) }),
        ]);
        let (task, jobs, problems) = setup(runner, "print('1 2', '3 4')");
        jobs.create(&job("j1"), 1).await.unwrap();
        let mut problem = Problem::new(Platform::Baekjoon, "1000", "https://example.com");
        problem.reference_solution_b64 = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, "a, b = map(int, input().split()); print(a + b)");
        problems.create(&problem, 1).await.unwrap();

        let outcome = task.handle(&serde_json::json!({"job_id": "j1"})).await;
        assert_eq!(outcome, TaskOutcome::Success);

        let j = jobs.get("j1").await.unwrap().unwrap();
        assert_eq!(j.status, JobStatus::Completed);
        let updated = problems.get("baekjoon", "1000").await.unwrap().unwrap();
        assert!(updated.completed);
        assert_eq!(updated.tcc, 2);
    }

    #[tokio::test]
    async fn unknown_job_id_is_terminal() {
        let (task, _jobs, _problems) = setup(MockRunner::stdout("[]"), "x");
        let outcome = task.handle(&serde_json::json!({"job_id": "missing"})).await;
        assert!(matches!(outcome, TaskOutcome::Terminal(_)));
    }

    #[tokio::test]
    async fn non_json_generator_output_retries_before_exhausting_attempts() {
        let runner = MockRunner::stdout("not json");
        let (task, jobs, problems) = setup(runner, "print('garbage')");
        jobs.create(&job("j1"), 1).await.unwrap();
        let mut problem = Problem::new(Platform::Baekjoon, "1000", "https://example.com");
        problem.reference_solution_b64 = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, "print(0)");
        problems.create(&problem, 1).await.unwrap();

        let outcome = task.handle(&serde_json::json!({"job_id": "j1"})).await;
        assert!(matches!(outcome, TaskOutcome::Retry(_)));
        let j = jobs.get("j1").await.unwrap().unwrap();
        assert_eq!(j.status, JobStatus::Processing);
    }
}
