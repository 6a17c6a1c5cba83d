use crate::AppState;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

fn unix_now() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64
}

/// Orphan recovery is itself a task (§4.10), so rather than calling
/// `OrphanRecoveryTask` directly this just enqueues `RecoverOrphanedJobs`
/// onto the maintenance queue on a fixed interval, the same entry point a
/// worker slot would use for any other task.
pub fn spawn_orphan_recovery_scheduler(state: Arc<AppState>, token: CancellationToken) -> JoinHandle<()> {
    let interval = std::time::Duration::from_secs(state.config.orphan_recovery.interval_seconds.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // first tick fires immediately; skip it so we wait one full interval before the first sweep
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    let now = unix_now();
                    if let Err(e) = state.broker.enqueue("maintenance", "RecoverOrphanedJobs", serde_json::json!({}), Default::default(), now).await {
                        tracing::error!(error = %e, "failed to enqueue orphan recovery sweep");
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::NoopMetrics;
    use crate::state::Dependencies;
    use judgeflow_broker::InMemoryBroker;
    use judgeflow_config::{Config, OrphanRecoveryConfig};
    use judgeflow_llm::MockProvider;
    use judgeflow_runner::MockRunner;
    use judgeflow_store::InMemoryStore;
    use judgeflow_tasks::MockFetcher;
    use judgeflow_testcases::InMemoryObjectStore;
    use std::time::Duration;

    #[tokio::test]
    async fn enqueues_a_recovery_task_after_one_interval() {
        let broker = Arc::new(InMemoryBroker::new());
        let mut config = Config::default();
        config.orphan_recovery = OrphanRecoveryConfig { interval_seconds: 1, threshold_seconds: 1800 };

        let deps = Dependencies {
            backend: Arc::new(InMemoryStore::new()),
            broker: broker.clone(),
            object_store: Arc::new(InMemoryObjectStore::new()),
            llm_providers: vec![Arc::new(MockProvider::new("mock", vec![]))],
            llm_provider: "mock".to_string(),
            runner: Arc::new(MockRunner::new(vec![])),
            fetcher: Arc::new(MockFetcher::new()),
            metrics: Arc::new(NoopMetrics),
        };
        let state = Arc::new(AppState::new(config, deps).unwrap());

        let token = CancellationToken::new();
        let handle = spawn_orphan_recovery_scheduler(state, token.clone());

        tokio::time::sleep(Duration::from_millis(1200)).await;
        token.cancel();
        handle.await.unwrap();

        assert!(broker.depth("maintenance").await.unwrap() >= 1);
    }
}
