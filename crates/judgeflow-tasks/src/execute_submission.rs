use crate::Error;
use futures::stream::{self, StreamExt};
use judgeflow_broker::{Broker, EnqueueOptions};
use judgeflow_runner::{Language, SandboxRunner};
use judgeflow_store::repo::{ProblemRepository, SearchHistoryRepository};
use judgeflow_testcases::TestCaseStore;
use judgeflow_types::{SearchHistory, TaskOutcome, TestCaseOutcome};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// `ExecuteSubmission` (§4.6.4): runs a user's code against every stored
/// test case, writes the resulting `SearchHistory` row, and enqueues a
/// `GenerateHints` task whenever at least one case failed.
pub struct ExecuteSubmissionTask {
    problems: Arc<ProblemRepository>,
    testcases: Arc<TestCaseStore>,
    history: Arc<SearchHistoryRepository>,
    runner: Arc<dyn SandboxRunner>,
    broker: Arc<dyn Broker>,
    hints_queue: String,
    default_timeout: Duration,
    concurrency: usize,
}

#[derive(Debug, Deserialize)]
struct Payload {
    platform: String,
    problem_identifier: String,
    code: String,
    language: String,
    user_id: String,
    #[serde(default)]
    is_public: bool,
}

impl ExecuteSubmissionTask {
    pub fn new(
        problems: Arc<ProblemRepository>,
        testcases: Arc<TestCaseStore>,
        history: Arc<SearchHistoryRepository>,
        runner: Arc<dyn SandboxRunner>,
        broker: Arc<dyn Broker>,
        hints_queue: impl Into<String>,
        default_timeout: Duration,
        concurrency: usize,
    ) -> Self {
        Self { problems, testcases, history, runner, broker, hints_queue: hints_queue.into(), default_timeout, concurrency }
    }

    async fn run(&self, payload: Payload, now: i64) -> Result<TaskOutcome, Error> {
        let Some(problem) = self.problems.get(&payload.platform, &payload.problem_identifier).await? else {
            return Ok(TaskOutcome::Terminal(format!("no such problem {}#{}", payload.platform, payload.problem_identifier)));
        };
        let Some(manifest) = self.testcases.read(&payload.platform, &payload.problem_identifier).await? else {
            return Ok(TaskOutcome::Terminal(format!("no test cases for {}#{}", payload.platform, payload.problem_identifier)));
        };
        let language = Language::parse(&payload.language)?;

        let outcomes = stream::iter(manifest.cases.into_iter().map(|case| {
            let runner = self.runner.clone();
            let code = payload.code.clone();
            let timeout = self.default_timeout;
            async move {
                match runner.run(&code, language, &case.input, timeout, None).await {
                    Ok(run) if run.timed_out => TestCaseOutcome { test_case_id: case.id, output: run.stdout, passed: false, error: Some("timed out".into()), status: "timeout".into() },
                    Ok(run) if !run.success() => {
                        TestCaseOutcome { test_case_id: case.id, output: run.stdout, passed: false, error: Some(run.stderr), status: "runtime_error".into() }
                    }
                    Ok(run) => {
                        let passed = run.stdout.trim() == case.output.trim();
                        TestCaseOutcome { test_case_id: case.id, output: run.stdout, passed, error: None, status: if passed { "ok".into() } else { "wrong_answer".into() } }
                    }
                    Err(e) => TestCaseOutcome { test_case_id: case.id, output: String::new(), passed: false, error: Some(e.to_string()), status: "sandbox_error".into() },
                }
            }
        }))
        .buffer_unordered(self.concurrency.max(1))
        .collect::<Vec<_>>()
        .await;

        let total = outcomes.len() as u32;
        let passed = outcomes.iter().filter(|o| o.passed).count() as u32;
        let failed = total - passed;

        let history_id = self.write_history(&payload, &problem.title, outcomes, passed, failed, total, now).await?;

        if failed > 0 {
            let payload = serde_json::json!({
                "email": payload.user_id,
                "platform": payload.platform,
                "problem_number": payload.problem_identifier,
                "history_id": history_id,
            });
            self.broker.enqueue(&self.hints_queue, "GenerateHints", payload, EnqueueOptions::default(), now).await?;
        }

        Ok(TaskOutcome::Success)
    }

    #[allow(clippy::too_many_arguments)]
    async fn write_history(
        &self,
        payload: &Payload,
        title: &str,
        outcomes: Vec<TestCaseOutcome>,
        passed: u32,
        failed: u32,
        total: u32,
        now: i64,
    ) -> Result<i64, Error> {
        let mut history_id = now * 1_000_000;
        loop {
            let history = SearchHistory {
                email: payload.user_id.clone(),
                platform: payload.platform.clone(),
                problem_number: payload.problem_identifier.clone(),
                history_id,
                title: title.to_string(),
                code: payload.code.clone(),
                language: payload.language.clone(),
                public: payload.is_public,
                passed,
                failed,
                total,
                outcomes: outcomes.clone(),
                hints: None,
                crt: now,
            };
            match self.history.create(&history, now).await {
                Ok(()) => return Ok(history_id),
                Err(judgeflow_store::Error::PreconditionFailed { .. }) => history_id += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[async_trait::async_trait]
impl judgeflow_worker::TaskHandler for ExecuteSubmissionTask {
    async fn handle(&self, payload: &serde_json::Value) -> TaskOutcome {
        let payload: Payload = match serde_json::from_value(payload.clone()) {
            Ok(p) => p,
            Err(e) => return TaskOutcome::Terminal(format!("malformed ExecuteSubmission payload: {e}")),
        };
        let now = crate::unix_now();
        match self.run(payload, now).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_retryable() => TaskOutcome::Retry(e.to_string()),
            Err(e) => TaskOutcome::Terminal(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use judgeflow_broker::InMemoryBroker;
    use judgeflow_runner::MockRunner;
    use judgeflow_store::InMemoryStore;
    use judgeflow_testcases::{InMemoryObjectStore, TestCase, TestCaseManifest};
    use judgeflow_types::Platform;
    use judgeflow_worker::TaskHandler;

    fn task(runner: MockRunner) -> (ExecuteSubmissionTask, Arc<ProblemRepository>, Arc<TestCaseStore>, Arc<InMemoryBroker>) {
        let store = Arc::new(InMemoryStore::new());
        let problems = Arc::new(ProblemRepository::new(store.clone()));
        let testcases = Arc::new(TestCaseStore::new(Arc::new(InMemoryObjectStore::new()), 6));
        let history = Arc::new(SearchHistoryRepository::new(store));
        let broker = Arc::new(InMemoryBroker::new());
        let task = ExecuteSubmissionTask::new(problems.clone(), testcases.clone(), history, Arc::new(runner), broker.clone(), "generation", Duration::from_secs(5), 8);
        (task, problems, testcases, broker)
    }

    #[tokio::test]
    async fn all_cases_passing_does_not_enqueue_hints() {
        let (task, problems, testcases, broker) = task(MockRunner::stdout("3"));
        problems.create(&judgeflow_types::Problem::new(Platform::Baekjoon, "1000", "https://example.com"), 1).await.unwrap();
        testcases.write("baekjoon", "1000", &TestCaseManifest { cases: vec![TestCase { id: "0".into(), input: "1 2".into(), output: "3".into() }] }).await.unwrap();

        let outcome = task
            .handle(&serde_json::json!({"platform": "baekjoon", "problem_identifier": "1000", "code": "print(1+2)", "language": "python", "user_id": "a@b.com", "is_public": false}))
            .await;
        assert_eq!(outcome, TaskOutcome::Success);
        assert_eq!(broker.depth("generation").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn a_failing_case_enqueues_a_hints_task() {
        let (task, problems, testcases, broker) = task(MockRunner::stdout("wrong"));
        problems.create(&judgeflow_types::Problem::new(Platform::Baekjoon, "1000", "https://example.com"), 1).await.unwrap();
        testcases.write("baekjoon", "1000", &TestCaseManifest { cases: vec![TestCase { id: "0".into(), input: "1 2".into(), output: "3".into() }] }).await.unwrap();

        let outcome = task
            .handle(&serde_json::json!({"platform": "baekjoon", "problem_identifier": "1000", "code": "print('wrong')", "language": "python", "user_id": "a@b.com", "is_public": false}))
            .await;
        assert_eq!(outcome, TaskOutcome::Success);
        assert_eq!(broker.depth("generation").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn missing_problem_is_terminal() {
        let (task, _problems, _testcases, _broker) = task(MockRunner::stdout("3"));
        let outcome = task
            .handle(&serde_json::json!({"platform": "baekjoon", "problem_identifier": "missing", "code": "x", "language": "python", "user_id": "a@b.com", "is_public": false}))
            .await;
        assert!(matches!(outcome, TaskOutcome::Terminal(_)));
    }
}
