//! Typed repositories built on top of `StoreBackend`. Each method here
//! corresponds to one documented access pattern (§9: "from ORM with
//! hidden queries to explicit access patterns") — there is no generic
//! query builder.

mod history;
mod job;
mod plan;
mod problem;
mod progress;
mod usage;
mod user;

pub use history::SearchHistoryRepository;
pub use job::{ProblemExtractionJobRepository, ScriptGenerationJobRepository};
pub use plan::PlanRepository;
pub use problem::ProblemRepository;
pub use progress::JobProgressRepository;
pub use usage::UsageLogRepository;
pub use user::UserRepository;
