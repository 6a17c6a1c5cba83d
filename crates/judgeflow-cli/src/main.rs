use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use judgeflow_broker::InMemoryBroker;
use judgeflow_config::Config;
use judgeflow_core::{AppState, Dependencies, NoopMetrics};
use judgeflow_llm::{AnthropicProvider, LlmProvider, MockProvider, OpenAiProvider};
use judgeflow_runner::LocalProcessRunner;
use judgeflow_store::InMemoryStore;
use judgeflow_tasks::ReqwestFetcher;
use judgeflow_testcases::InMemoryObjectStore;
use judgeflow_types::{JobKind, JobStatus};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "judgeflow")]
#[command(version)]
#[command(about = "Worker pool, task library, and admin tooling for the algorithm-judge backend")]
struct Cli {
    /// Path to a judgeflow.toml config file; defaults baked in if omitted.
    #[arg(long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Which configured LLM provider to route completions through.
    #[arg(long, global = true, default_value = "openai")]
    llm_provider: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the worker pool and the orphan-recovery scheduler until signaled to stop.
    Serve,
    /// Enqueue one immediate orphan-recovery sweep.
    Recover,
    /// List jobs of one kind by status.
    JobsList(JobsListArgs),
    /// Print one job by kind and id.
    JobsGet(JobsGetArgs),
    /// Delete one job and its progress history.
    JobsDelete(JobsGetArgs),
}

#[derive(clap::Args)]
struct JobsListArgs {
    #[arg(long, value_enum)]
    kind: JobKindArg,
    #[arg(long, value_enum, default_value = "processing")]
    status: JobStatusArg,
    #[arg(long, default_value_t = 50)]
    limit: usize,
}

#[derive(clap::Args)]
struct JobsGetArgs {
    #[arg(long, value_enum)]
    kind: JobKindArg,
    #[arg(long)]
    job_id: String,
}

#[derive(Copy, Clone, ValueEnum)]
enum JobKindArg {
    ScriptGeneration,
    ProblemExtraction,
}

impl From<JobKindArg> for JobKind {
    fn from(value: JobKindArg) -> Self {
        match value {
            JobKindArg::ScriptGeneration => JobKind::ScriptGeneration,
            JobKindArg::ProblemExtraction => JobKind::ProblemExtraction,
        }
    }
}

#[derive(Copy, Clone, ValueEnum)]
enum JobStatusArg {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl From<JobStatusArg> for JobStatus {
    fn from(value: JobStatusArg) -> Self {
        match value {
            JobStatusArg::Pending => JobStatus::Pending,
            JobStatusArg::Processing => JobStatus::Processing,
            JobStatusArg::Completed => JobStatus::Completed,
            JobStatusArg::Failed => JobStatus::Failed,
        }
    }
}

fn unix_now() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64
}

/// Builds every external collaborator the worker pool needs. The store,
/// broker, and test-case object store are in-memory here; swapping in the
/// `dynamodb`/`s3`-featured backends behind `judgeflow-store`/
/// `judgeflow-testcases` is a follow-up left to the deployment layer (see
/// DESIGN.md), not something this CLI chooses for the caller.
fn build_dependencies(llm_provider: &str) -> Dependencies {
    let llm_timeout = Duration::from_secs(30 * 60);
    let mut providers: Vec<Arc<dyn LlmProvider>> = vec![Arc::new(OpenAiProvider::from_env(llm_timeout)), Arc::new(AnthropicProvider::from_env(llm_timeout))];
    if llm_provider == "mock" || std::env::var("JUDGEFLOW_USE_MOCK_LLM").is_ok() {
        providers.push(Arc::new(MockProvider::new("mock", vec![])));
    }

    Dependencies {
        backend: Arc::new(InMemoryStore::new()),
        broker: Arc::new(InMemoryBroker::new()),
        object_store: Arc::new(InMemoryObjectStore::new()),
        llm_providers: providers,
        llm_provider: llm_provider.to_string(),
        runner: Arc::new(LocalProcessRunner::new()),
        fetcher: Arc::new(ReqwestFetcher::new()),
        metrics: Arc::new(NoopMetrics),
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(path).with_context(|| format!("loading config from {}", path.display())),
        None => Ok(Config::default()),
    }
    .and_then(|cfg| cfg.apply_env().context("applying environment overrides"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let deps = build_dependencies(&cli.llm_provider);
    let state = Arc::new(AppState::new(config, deps).map_err(|e| anyhow::anyhow!("{e}"))?);

    match cli.command {
        Commands::Serve => serve(state).await,
        Commands::Recover => recover(&state).await,
        Commands::JobsList(args) => jobs_list(&state, args).await,
        Commands::JobsGet(args) => jobs_get(&state, args).await,
        Commands::JobsDelete(args) => jobs_delete(&state, args).await,
    }
}

async fn serve(state: Arc<AppState>) -> Result<()> {
    tracing::info!(pool_size = state.config.worker.resolved_pool_size(), "starting worker pool");
    let running = judgeflow_core::run(state);
    judgeflow_core::shutdown_signal().await;
    running.shutdown().await;
    Ok(())
}

async fn recover(state: &AppState) -> Result<()> {
    state
        .broker
        .enqueue("maintenance", "RecoverOrphanedJobs", serde_json::json!({}), Default::default(), unix_now())
        .await
        .context("enqueueing recovery sweep")?;
    println!("enqueued one orphan-recovery sweep");
    Ok(())
}

async fn jobs_list(state: &AppState, args: JobsListArgs) -> Result<()> {
    let status = JobStatus::from(args.status);
    match JobKind::from(args.kind) {
        JobKind::ScriptGeneration => {
            let page = state.sg_jobs.list_by_status(status, None, args.limit).await?;
            for job in page.items {
                println!("{}  {}#{}  {:?}", job.job_id, job.platform, job.problem_id, job.status);
            }
        }
        JobKind::ProblemExtraction => {
            let page = state.pe_jobs.list_by_status(status, None, args.limit).await?;
            for job in page.items {
                println!("{}  {}  {:?}", job.job_id, job.url, job.status);
            }
        }
    }
    Ok(())
}

async fn jobs_get(state: &AppState, args: JobsGetArgs) -> Result<()> {
    match JobKind::from(args.kind) {
        JobKind::ScriptGeneration => match state.sg_jobs.get(&args.job_id).await? {
            Some(job) => println!("{job:#?}"),
            None => println!("no such job"),
        },
        JobKind::ProblemExtraction => match state.pe_jobs.get(&args.job_id).await? {
            Some(job) => println!("{job:#?}"),
            None => println!("no such job"),
        },
    }
    Ok(())
}

async fn jobs_delete(state: &AppState, args: JobsGetArgs) -> Result<()> {
    let now = unix_now();
    match JobKind::from(args.kind) {
        JobKind::ScriptGeneration => state.sg_jobs.delete(&args.job_id, now).await?,
        JobKind::ProblemExtraction => state.pe_jobs.delete(&args.job_id, now).await?,
    }
    println!("deleted {}", args.job_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_kind_arg_round_trips() {
        assert_eq!(JobKind::from(JobKindArg::ScriptGeneration), JobKind::ScriptGeneration);
        assert_eq!(JobKind::from(JobKindArg::ProblemExtraction), JobKind::ProblemExtraction);
    }

    #[test]
    fn job_status_arg_round_trips() {
        assert_eq!(JobStatus::from(JobStatusArg::Processing), JobStatus::Processing);
        assert_eq!(JobStatus::from(JobStatusArg::Failed), JobStatus::Failed);
    }

    #[tokio::test]
    async fn builds_dependencies_without_a_network_call() {
        let deps = build_dependencies("mock");
        assert!(deps.llm_providers.iter().any(|p| p.name() == "mock"));
    }
}
