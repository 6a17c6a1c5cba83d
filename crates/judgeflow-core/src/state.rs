use crate::metrics::Metrics;
use crate::Error;
use judgeflow_broker::Broker;
use judgeflow_config::Config;
use judgeflow_jobs::{ProblemExtractionJobService, ProgressTracker, ScriptGenerationJobService};
use judgeflow_llm::{LlmGateway, LlmProvider};
use judgeflow_runner::SandboxRunner;
use judgeflow_store::repo::{
    JobProgressRepository, PlanRepository, ProblemExtractionJobRepository, ProblemRepository, ScriptGenerationJobRepository, SearchHistoryRepository,
    UsageLogRepository, UserRepository,
};
use judgeflow_store::StoreBackend;
use judgeflow_tasks::{
    DeleteJobTask, ExecuteSubmissionTask, ExtractProblemTask, GenerateGeneratorScriptTask, GenerateHintsTask, GenerateOutputsTask, OrphanRecoveryTask, WebpageFetcher,
};
use judgeflow_testcases::{ObjectStore, TestCaseStore};
use judgeflow_usage::RateLimiter;
use judgeflow_worker::TaskRegistry;
use std::sync::Arc;
use std::time::Duration;

/// Per-platform fetch concurrency (§4.6.1: "default 4").
const EXTRACT_PLATFORM_PERMITS: u32 = 4;
/// Per-task concurrency cap for independent sandbox runs (§5: "default 8").
const TASK_CONCURRENCY: usize = 8;
/// Execute-submission per-case timeout (§4.6.4: "default 5s"); see
/// DESIGN.md for why this is a constant rather than a `Plan` field.
const EXECUTION_TIMEOUT: Duration = Duration::from_secs(5);
/// Generator-script sandbox run timeout.
const GENERATOR_RUN_TIMEOUT: Duration = Duration::from_secs(30);

/// External collaborators the binary/CLI layer selects (in-memory doubles
/// for local runs, real backends behind the same traits otherwise) and
/// hands to `AppState::new`. `judgeflow-core` only wires these together; it
/// never constructs a `reqwest::Client` or an AWS SDK client itself.
pub struct Dependencies {
    pub backend: Arc<dyn StoreBackend>,
    pub broker: Arc<dyn Broker>,
    pub object_store: Arc<dyn ObjectStore>,
    pub llm_providers: Vec<Arc<dyn LlmProvider>>,
    pub llm_provider: String,
    pub runner: Arc<dyn SandboxRunner>,
    pub fetcher: Arc<dyn WebpageFetcher>,
    pub metrics: Arc<dyn Metrics>,
}

/// Every singleton the worker pool and an operator CLI need: the typed
/// repositories, job services, the task registry, and the config they were
/// built from. Construction order follows each layer's own dependency
/// direction (store -> repos -> services -> tasks -> registry), mirroring
/// how `dashflow-cli`'s command handlers assemble their clients once at
/// startup rather than per-request.
pub struct AppState {
    pub config: Config,
    pub backend: Arc<dyn StoreBackend>,
    pub broker: Arc<dyn Broker>,
    pub metrics: Arc<dyn Metrics>,

    pub problems: Arc<ProblemRepository>,
    pub history: Arc<SearchHistoryRepository>,
    pub plans: Arc<PlanRepository>,
    pub users: Arc<UserRepository>,
    pub usage: Arc<UsageLogRepository>,
    pub testcases: Arc<TestCaseStore>,

    pub sg_jobs: Arc<ScriptGenerationJobService>,
    pub pe_jobs: Arc<ProblemExtractionJobService>,
    pub progress: Arc<ProgressTracker>,
    pub rate_limiter: Arc<RateLimiter>,
    pub llm: Arc<LlmGateway>,

    pub registry: TaskRegistry,
}

impl AppState {
    pub fn new(config: Config, deps: Dependencies) -> Result<Self, Error> {
        let llm = Arc::new(LlmGateway::new(deps.llm_providers));
        if !llm.provider_names().contains(&deps.llm_provider.as_str()) {
            return Err(Error::UnknownLlmProvider(deps.llm_provider));
        }

        let problems = Arc::new(ProblemRepository::new(deps.backend.clone()));
        let history = Arc::new(SearchHistoryRepository::new(deps.backend.clone()));
        let plans = Arc::new(PlanRepository::new(deps.backend.clone()));
        let users = Arc::new(UserRepository::new(deps.backend.clone()));
        let usage = Arc::new(UsageLogRepository::new(deps.backend.clone()));
        let testcases = Arc::new(TestCaseStore::new(deps.object_store, config.testcases.gzip_level));

        let progress = Arc::new(ProgressTracker::new(Arc::new(JobProgressRepository::new(deps.backend.clone()))));
        let sg_jobs = Arc::new(ScriptGenerationJobService::new(Arc::new(ScriptGenerationJobRepository::new(deps.backend.clone())), progress.clone()));
        let pe_jobs = Arc::new(ProblemExtractionJobService::new(Arc::new(ProblemExtractionJobRepository::new(deps.backend.clone())), progress.clone()));
        let rate_limiter = Arc::new(RateLimiter::new(usage.clone()));

        let extract_problem = Arc::new(ExtractProblemTask::new(
            pe_jobs.clone(),
            problems.clone(),
            progress.clone(),
            deps.fetcher,
            llm.clone(),
            deps.llm_provider.clone(),
            config.llm.clone(),
            config.task_retry("ExtractProblem"),
            EXTRACT_PLATFORM_PERMITS,
        ));

        let generate_generator_script = Arc::new(GenerateGeneratorScriptTask::new(
            sg_jobs.clone(),
            problems.clone(),
            testcases.clone(),
            progress.clone(),
            deps.runner.clone(),
            llm.clone(),
            deps.llm_provider.clone(),
            config.llm.clone(),
            config.testcases.clone(),
            config.task_retry("GenerateGeneratorScript"),
            GENERATOR_RUN_TIMEOUT,
            TASK_CONCURRENCY,
        ));

        let generate_outputs = Arc::new(GenerateOutputsTask::new(problems.clone(), testcases.clone(), deps.runner.clone(), GENERATOR_RUN_TIMEOUT, TASK_CONCURRENCY));

        let execute_submission = Arc::new(ExecuteSubmissionTask::new(
            problems.clone(),
            testcases.clone(),
            history.clone(),
            deps.runner,
            deps.broker.clone(),
            "ai",
            EXECUTION_TIMEOUT,
            TASK_CONCURRENCY,
        ));

        let generate_hints = Arc::new(GenerateHintsTask::new(history.clone(), llm.clone(), deps.llm_provider.clone(), config.llm.clone()));

        let delete_job = Arc::new(DeleteJobTask::new(sg_jobs.clone(), pe_jobs.clone()));

        let orphan_recovery = Arc::new(OrphanRecoveryTask::new(deps.backend.clone(), sg_jobs.clone(), pe_jobs.clone(), config.orphan_recovery.threshold_seconds));

        let registry = judgeflow_tasks::build_registry(
            extract_problem,
            generate_generator_script,
            generate_outputs,
            execute_submission,
            generate_hints,
            delete_job,
            orphan_recovery,
        );

        Ok(Self {
            config,
            backend: deps.backend,
            broker: deps.broker,
            metrics: deps.metrics,
            problems,
            history,
            plans,
            users,
            usage,
            testcases,
            sg_jobs,
            pe_jobs,
            progress,
            rate_limiter,
            llm,
            registry,
        })
    }
}
