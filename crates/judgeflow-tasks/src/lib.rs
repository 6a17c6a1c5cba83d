//! Task library (§4.6): the handlers the worker pool dispatches broker
//! messages to, plus the orphan-recovery sweep and the registry that wires
//! them together by task name.

mod delete_job;
mod error;
mod execute_submission;
mod extract_problem;
mod fetcher;
mod generate_generator_script;
mod generate_hints;
mod generate_outputs;
mod orphan_recovery;

pub use delete_job::DeleteJobTask;
pub use error::Error;
pub use execute_submission::ExecuteSubmissionTask;
pub use extract_problem::ExtractProblemTask;
pub use fetcher::{MockFetcher, ReqwestFetcher, WebpageFetcher};
pub use generate_generator_script::GenerateGeneratorScriptTask;
pub use generate_hints::GenerateHintsTask;
pub use generate_outputs::GenerateOutputsTask;
pub use orphan_recovery::OrphanRecoveryTask;

mod registry;
pub use registry::build_registry;

mod testcase_gen;

use std::time::{SystemTime, UNIX_EPOCH};

pub(crate) fn unix_now() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64
}
