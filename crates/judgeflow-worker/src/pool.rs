use crate::handler::TaskRegistry;
use crate::Error;
use judgeflow_broker::{Broker, Message};
use judgeflow_config::{BrokerConfig, WorkerConfig};
use judgeflow_retry::Backoff;
use judgeflow_types::TaskOutcome;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Sleep between empty dequeues so an idle slot doesn't spin (mirrors the
/// idle-poll-sleep idiom used around Kafka consumers elsewhere in this
/// codebase).
const IDLE_POLL_SLEEP: Duration = Duration::from_millis(200);

fn unix_now() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64
}

/// A fixed-size pool of slots pulling from the configured queues (§4.5).
/// Each slot is a single tokio task with prefetch 1: it finishes and
/// acks/nacks one message before asking the broker for the next, so a
/// pathological task can never starve its neighbors out of their own
/// visibility budget.
pub struct WorkerPool {
    broker: Arc<dyn Broker>,
    registry: TaskRegistry,
    worker_config: WorkerConfig,
    broker_config: BrokerConfig,
    backoff: Backoff,
}

impl WorkerPool {
    pub fn new(broker: Arc<dyn Broker>, registry: TaskRegistry, worker_config: WorkerConfig, broker_config: BrokerConfig) -> Self {
        Self { broker, registry, worker_config, broker_config, backoff: Backoff::worker_default() }
    }

    /// Spawns the pool's slots and returns a handle that can be used to
    /// drive a graceful shutdown.
    pub fn run(self: Arc<Self>) -> RunningPool {
        let token = CancellationToken::new();
        let pool_size = self.worker_config.resolved_pool_size();
        let handles = (0..pool_size)
            .map(|slot| {
                let pool = self.clone();
                let token = token.clone();
                tokio::spawn(async move { pool.run_slot(slot, token).await })
            })
            .collect();
        RunningPool { token, handles, shutdown_grace: Duration::from_secs(self.worker_config.shutdown_grace_seconds) }
    }

    async fn run_slot(&self, slot: usize, token: CancellationToken) {
        tracing::info!(slot, queues = ?self.worker_config.queues, "worker slot started");
        let mut next_queue = 0usize;
        loop {
            if token.is_cancelled() {
                break;
            }
            let queue = self.worker_config.queues[next_queue % self.worker_config.queues.len()].clone();
            next_queue = next_queue.wrapping_add(1);
            let visibility_timeout = self.broker_config.visibility_timeout(&queue);

            let dequeued = tokio::select! {
                _ = token.cancelled() => break,
                result = self.broker.dequeue(std::slice::from_ref(&queue), 1, visibility_timeout, unix_now()) => result,
            };

            let messages = match dequeued {
                Ok(messages) => messages,
                Err(e) => {
                    tracing::warn!(slot, queue, error = %e, "dequeue failed");
                    tokio::time::sleep(IDLE_POLL_SLEEP).await;
                    continue;
                }
            };

            if messages.is_empty() {
                tokio::time::sleep(IDLE_POLL_SLEEP).await;
                continue;
            }

            for message in messages {
                self.dispatch(slot, message).await;
            }
        }
        tracing::info!(slot, "worker slot stopped");
    }

    async fn dispatch(&self, slot: usize, message: Message) {
        let Some(handler) = self.registry.get(&message.task_name) else {
            tracing::error!(slot, task_name = %message.task_name, "no handler registered, dead-lettering");
            let _ = self.broker.nack(&message, Duration::ZERO, unix_now()).await;
            return;
        };

        let outcome = handler.handle(&message.payload).await;
        let result = match outcome {
            TaskOutcome::Success => self.broker.ack(&message).await,
            TaskOutcome::Retry(reason) => {
                tracing::warn!(slot, task_name = %message.task_name, attempt = message.attempt, reason, "task requested retry");
                let delay = self.backoff.delay_for(message.attempt);
                self.broker.nack(&message, delay, unix_now()).await
            }
            TaskOutcome::Terminal(reason) => {
                tracing::error!(slot, task_name = %message.task_name, reason, "task failed terminally, not retrying");
                self.broker.ack(&message).await
            }
        };

        if let Err(e) = result {
            tracing::error!(slot, broker_id = %message.broker_id, error = %e, "failed to finalize message delivery");
        }
    }
}

/// Handle to a spawned pool, used to drive a graceful shutdown (§4.10):
/// signal cancellation, then wait up to `shutdown_grace_seconds` for
/// in-flight tasks to finish before abandoning them.
pub struct RunningPool {
    token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
    shutdown_grace: Duration,
}

impl RunningPool {
    pub async fn shutdown(self) {
        self.token.cancel();
        let join_all = futures::future::join_all(self.handles);
        if tokio::time::timeout(self.shutdown_grace, join_all).await.is_err() {
            tracing::warn!(grace_seconds = self.shutdown_grace.as_secs(), "shutdown grace period elapsed with slots still running");
        }
    }
}

/// Waits for Ctrl+C (or SIGTERM on unix), matching the signal-handling
/// idiom used by this codebase's other long-running services.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C, initiating graceful shutdown"),
        _ = terminate => tracing::info!("received SIGTERM, initiating graceful shutdown"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use judgeflow_broker::{EnqueueOptions, InMemoryBroker};
    use judgeflow_config::{BrokerConfig, WorkerConfig};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingHandler {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl crate::TaskHandler for CountingHandler {
        async fn handle(&self, _payload: &serde_json::Value) -> TaskOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            TaskOutcome::Success
        }
    }

    #[tokio::test]
    async fn dispatches_enqueued_message_to_registered_handler() {
        let broker: Arc<dyn Broker> = Arc::new(InMemoryBroker::new());
        broker
            .enqueue("jobs", "extract-problem", serde_json::json!({}), EnqueueOptions::default(), unix_now())
            .await
            .unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let registry = TaskRegistry::new().register("extract-problem", Arc::new(CountingHandler { calls: calls.clone() }));
        let worker_config = WorkerConfig { pool_size: Some(1), queues: vec!["jobs".to_string()], shutdown_grace_seconds: 5 };
        let pool = Arc::new(WorkerPool::new(broker, registry, worker_config, BrokerConfig::default()));

        let running = pool.run();
        tokio::time::sleep(Duration::from_millis(300)).await;
        running.shutdown().await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_task_name_is_nacked_not_panicked() {
        let broker: Arc<dyn Broker> = Arc::new(InMemoryBroker::new());
        broker
            .enqueue("jobs", "does-not-exist", serde_json::Value::Null, EnqueueOptions::default(), unix_now())
            .await
            .unwrap();

        let worker_config = WorkerConfig { pool_size: Some(1), queues: vec!["jobs".to_string()], shutdown_grace_seconds: 5 };
        let pool = Arc::new(WorkerPool::new(broker.clone(), TaskRegistry::new(), worker_config, BrokerConfig::default()));

        let running = pool.run();
        tokio::time::sleep(Duration::from_millis(300)).await;
        running.shutdown().await;

        // the slot logged and nacked instead of panicking; the message is
        // still accounted for somewhere (ready to redeliver, or dead-lettered)
        let remaining = broker.depth("jobs").await.unwrap() + broker.dead_letters("jobs").await.unwrap().len();
        assert!(remaining >= 1);
    }
}
