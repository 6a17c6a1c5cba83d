use crate::Error;
use judgeflow_config::LlmConfig;
use judgeflow_llm::LlmGateway;
use judgeflow_store::repo::SearchHistoryRepository;
use judgeflow_types::TaskOutcome;
use serde::Deserialize;
use std::sync::Arc;

/// `GenerateHints` (§4.6.5): re-reads a `SearchHistory` row and, if it still
/// has failing cases and no hints yet, asks the LLM for guidance and writes
/// the hint list back. A no-op if the history already has hints or never
/// failed — both of which can legitimately happen if this task is retried
/// after its own write already landed.
pub struct GenerateHintsTask {
    history: Arc<SearchHistoryRepository>,
    llm: Arc<LlmGateway>,
    llm_provider: String,
    llm_config: LlmConfig,
}

#[derive(Debug, Deserialize)]
struct Payload {
    email: String,
    platform: String,
    problem_number: String,
    history_id: i64,
}

impl GenerateHintsTask {
    pub fn new(history: Arc<SearchHistoryRepository>, llm: Arc<LlmGateway>, llm_provider: impl Into<String>, llm_config: LlmConfig) -> Self {
        Self { history, llm, llm_provider: llm_provider.into(), llm_config }
    }

    async fn run(&self, payload: Payload, now: i64) -> Result<TaskOutcome, Error> {
        let Some(mut history) = self.history.get(&payload.email, &payload.platform, &payload.problem_number, payload.history_id).await? else {
            return Ok(TaskOutcome::Terminal(format!("no history row {}/{}/{}#{}", payload.email, payload.platform, payload.problem_number, payload.history_id)));
        };
        if !history.needs_hints() {
            return Ok(TaskOutcome::Success);
        }

        let failed_cases: Vec<_> = history.outcomes.iter().filter(|o| !o.passed).collect();
        let prompt = format!(
            "The user's {} submission for \"{}\" failed {} of {} test cases.\n\n\
             Code:\n{}\n\nFailing cases:\n{}\n\n\
             Write a short, numbered list of hints that nudge the user toward the fix \
             without revealing the full solution. Return a JSON array of strings.",
            history.language,
            history.title,
            history.failed,
            history.total,
            history.code,
            failed_cases
                .iter()
                .map(|o| format!("- case {}: status={}, output={:?}", o.test_case_id, o.status, o.output))
                .collect::<Vec<_>>()
                .join("\n"),
        );

        let response = self.llm.generate(&self.llm_provider, &self.llm_config.model, &prompt, &self.llm_config).await?;
        let hints: Vec<String> = serde_json::from_str(&response).unwrap_or_else(|_| vec![response]);

        history.hints = Some(hints);
        self.history.set_hints(&history, now).await?;
        Ok(TaskOutcome::Success)
    }
}

#[async_trait::async_trait]
impl judgeflow_worker::TaskHandler for GenerateHintsTask {
    async fn handle(&self, payload: &serde_json::Value) -> TaskOutcome {
        let payload: Payload = match serde_json::from_value(payload.clone()) {
            Ok(p) => p,
            Err(e) => return TaskOutcome::Terminal(format!("malformed GenerateHints payload: {e}")),
        };
        let now = crate::unix_now();
        match self.run(payload, now).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_retryable() => TaskOutcome::Retry(e.to_string()),
            Err(e) => TaskOutcome::Terminal(e.to_string()),
        }
    }
}
