use crate::Error;
use judgeflow_jobs::{ProblemExtractionJobService, ScriptGenerationJobService};
use judgeflow_types::{JobKind, TaskOutcome};
use serde::Deserialize;
use std::sync::Arc;

/// `DeleteJob` (§4.6.6): admin-only. Deletes a job row and all its
/// progress children in one call; both job services already implement
/// this as a single conditional deletion of the Job item plus a clear of
/// its progress partition, so this task is just the dispatch by kind.
pub struct DeleteJobTask {
    sg_jobs: Arc<ScriptGenerationJobService>,
    pe_jobs: Arc<ProblemExtractionJobService>,
}

#[derive(Debug, Deserialize)]
struct Payload {
    job_kind: JobKindPayload,
    job_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum JobKindPayload {
    ScriptGeneration,
    ProblemExtraction,
}

impl From<JobKindPayload> for JobKind {
    fn from(value: JobKindPayload) -> Self {
        match value {
            JobKindPayload::ScriptGeneration => JobKind::ScriptGeneration,
            JobKindPayload::ProblemExtraction => JobKind::ProblemExtraction,
        }
    }
}

impl DeleteJobTask {
    pub fn new(sg_jobs: Arc<ScriptGenerationJobService>, pe_jobs: Arc<ProblemExtractionJobService>) -> Self {
        Self { sg_jobs, pe_jobs }
    }

    async fn run(&self, payload: Payload, now: i64) -> Result<TaskOutcome, Error> {
        match JobKind::from(payload.job_kind) {
            JobKind::ScriptGeneration => self.sg_jobs.delete(&payload.job_id, now).await?,
            JobKind::ProblemExtraction => self.pe_jobs.delete(&payload.job_id, now).await?,
        }
        Ok(TaskOutcome::Success)
    }
}

#[async_trait::async_trait]
impl judgeflow_worker::TaskHandler for DeleteJobTask {
    async fn handle(&self, payload: &serde_json::Value) -> TaskOutcome {
        let payload: Payload = match serde_json::from_value(payload.clone()) {
            Ok(p) => p,
            Err(e) => return TaskOutcome::Terminal(format!("malformed DeleteJob payload: {e}")),
        };
        let now = crate::unix_now();
        match self.run(payload, now).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_retryable() => TaskOutcome::Retry(e.to_string()),
            Err(e) => TaskOutcome::Terminal(e.to_string()),
        }
    }
}
