//! Core domain types shared by every judgeflow crate: the single-table item
//! envelope, entity structs, key builders, and the small set of cross-cutting
//! enums (job status, task outcome) that the store, worker pool, and task
//! library all need to agree on.

mod history;
mod item;
mod job;
mod keys;
mod plan;
mod problem;
mod usage;
mod user;

pub use history::{SearchHistory, TestCaseOutcome};
pub use item::Item;
pub use job::{JobKind, JobProgress, JobStatus, ProblemExtractionJob, ProgressStatus, ScriptGenerationJob, TaskOutcome};
pub use keys::Keys;
pub use plan::Plan;
pub use problem::{Platform, Problem, ProblemStatus};
pub use usage::{UsageAction, UsageLog};
pub use user::User;

/// Seconds-since-epoch timestamp, matching the wire shape in §6
/// ("Timestamps are integer seconds since epoch; rows with ms precision use
/// a separate field").
pub type UnixSeconds = i64;

/// Milliseconds-since-epoch timestamp, used only where
/// microsecond/millisecond-ordered sort keys (SearchHistory rows).
pub type UnixMillis = i64;

/// Ninety days in seconds, the UsageLog TTL horizon.
pub const USAGE_LOG_TTL_SECONDS: i64 = 90 * 86_400;
