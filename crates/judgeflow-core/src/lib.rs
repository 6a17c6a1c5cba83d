//! Process-wide wiring: assembles every crate below it into one `AppState`,
//! runs the worker pool against it, and drives the orphan-recovery
//! scheduler and graceful shutdown. This is the thing `judgeflow-cli`'s
//! `serve` command calls; there is no HTTP surface here (that crosses into
//! the excluded admin/API layer).

mod error;
mod metrics;
mod scheduler;
mod state;

pub use error::Error;
pub use judgeflow_worker::shutdown_signal;
pub use metrics::{InMemoryMetrics, Metrics, NoopMetrics};
pub use scheduler::spawn_orphan_recovery_scheduler;
pub use state::{AppState, Dependencies};

use judgeflow_worker::{RunningPool, WorkerPool};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Starts the worker pool and the orphan-recovery scheduler against one
/// `AppState`. Returns a handle that shuts both down together.
pub fn run(state: Arc<AppState>) -> Running {
    let pool = Arc::new(WorkerPool::new(state.broker.clone(), state.registry.clone(), state.config.worker.clone(), state.config.broker.clone()));
    let running_pool = pool.run();

    let scheduler_token = CancellationToken::new();
    let scheduler = spawn_orphan_recovery_scheduler(state, scheduler_token.clone());

    Running { running_pool, scheduler, scheduler_token }
}

pub struct Running {
    running_pool: RunningPool,
    scheduler: tokio::task::JoinHandle<()>,
    scheduler_token: CancellationToken,
}

impl Running {
    pub async fn shutdown(self) {
        self.scheduler_token.cancel();
        self.running_pool.shutdown().await;
        let _ = self.scheduler.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Dependencies;
    use judgeflow_broker::InMemoryBroker;
    use judgeflow_config::Config;
    use judgeflow_llm::MockProvider;
    use judgeflow_runner::MockRunner;
    use judgeflow_store::InMemoryStore;
    use judgeflow_tasks::MockFetcher;
    use judgeflow_testcases::InMemoryObjectStore;

    #[tokio::test]
    async fn run_and_shutdown_do_not_hang() {
        let deps = Dependencies {
            backend: Arc::new(InMemoryStore::new()),
            broker: Arc::new(InMemoryBroker::new()),
            object_store: Arc::new(InMemoryObjectStore::new()),
            llm_providers: vec![Arc::new(MockProvider::new("mock", vec![]))],
            llm_provider: "mock".to_string(),
            runner: Arc::new(MockRunner::new(vec![])),
            fetcher: Arc::new(MockFetcher::new()),
            metrics: Arc::new(NoopMetrics),
        };
        let mut config = Config::default();
        config.worker.pool_size = Some(1);
        let state = Arc::new(AppState::new(config, deps).unwrap());

        let running = run(state);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        running.shutdown().await;
    }
}
