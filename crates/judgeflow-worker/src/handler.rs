use async_trait::async_trait;
use judgeflow_types::TaskOutcome;
use std::collections::HashMap;
use std::sync::Arc;

/// One unit of work the pool can dispatch a broker message to (§4.5's
/// "task library"). Implementors never see the broker's retry bookkeeping;
/// they just report what happened.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn handle(&self, payload: &serde_json::Value) -> TaskOutcome;
}

/// Maps a broker message's `task_name` to the handler that runs it.
#[derive(Default, Clone)]
pub struct TaskRegistry {
    handlers: HashMap<String, Arc<dyn TaskHandler>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, task_name: impl Into<String>, handler: Arc<dyn TaskHandler>) -> Self {
        self.handlers.insert(task_name.into(), handler);
        self
    }

    pub fn get(&self, task_name: &str) -> Option<Arc<dyn TaskHandler>> {
        self.handlers.get(task_name).cloned()
    }
}
