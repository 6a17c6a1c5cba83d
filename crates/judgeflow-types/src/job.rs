use serde::{Deserialize, Serialize};

/// The finite state machine from §4.7. Transitions are validated by
/// `can_transition_to`; the store layer is responsible for making the
/// transition conditional on the current state (invariant 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// `PENDING -> PROCESSING -> {COMPLETED, FAILED}`, plus the one
    /// recovery edge `PROCESSING -> FAILED` (§4.7 and §4.10). No other
    /// transition is permitted.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

/// Which family of job a `JobProgress` row belongs to; used to build the
/// `JOB#{kind}#{job_id}` partition key (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    ScriptGeneration,
    ProblemExtraction,
}

impl JobKind {
    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::ScriptGeneration => "script-generation",
            JobKind::ProblemExtraction => "problem-extraction",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Started,
    InProgress,
    Completed,
    Failed,
}

/// An append-only progress row (§4.7): `(step, message, status, crt)`,
/// keyed by timestamp within the job's partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobProgress {
    pub job_kind: JobKind,
    pub job_id: String,
    pub step: String,
    pub message: String,
    pub status: ProgressStatus,
    pub crt: i64,
}

/// `ScriptGenerationJob` entity payload (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptGenerationJob {
    pub job_id: String,
    pub platform: String,
    pub problem_id: String,
    pub title: String,
    pub url: String,
    pub tags: Vec<String>,
    pub language: String,
    pub constraints: String,
    pub generator_code: Option<String>,
    pub status: JobStatus,
    pub broker_task_id: Option<String>,
    pub error: Option<String>,
}

/// `ProblemExtractionJob` entity payload (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemExtractionJob {
    pub job_id: String,
    pub platform: String,
    pub url: String,
    pub problem_identifier: String,
    pub status: JobStatus,
    pub broker_task_id: Option<String>,
    pub error: Option<String>,
}

/// Uniform outcome contract every task handler returns (§9: "From
/// exceptions for control flow to typed error kinds"). The worker pool
/// branches retry/terminal handling purely on this variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Retry(String),
    Terminal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_can_only_advance_to_processing() {
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Processing));
        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Failed));
    }

    #[test]
    fn processing_can_complete_or_fail() {
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Failed));
    }

    #[test]
    fn terminal_states_cannot_transition() {
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Failed));
        assert!(!JobStatus::Failed.can_transition_to(JobStatus::Processing));
    }

    #[test]
    fn completed_and_failed_are_terminal() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }
}
