use judgeflow_worker::{TaskHandler, TaskRegistry};
use std::sync::Arc;

/// Wires every task handler into one registry keyed by the broker's
/// `task_name`, mirroring the name-to-implementation lookup in
/// `dashflow-module-discovery`. Construction of each handler (its store,
/// LLM, and sandbox dependencies) is the caller's job; this just assigns
/// names.
#[allow(clippy::too_many_arguments)]
pub fn build_registry(
    extract_problem: Arc<dyn TaskHandler>,
    generate_generator_script: Arc<dyn TaskHandler>,
    generate_outputs: Arc<dyn TaskHandler>,
    execute_submission: Arc<dyn TaskHandler>,
    generate_hints: Arc<dyn TaskHandler>,
    delete_job: Arc<dyn TaskHandler>,
    recover_orphaned_jobs: Arc<dyn TaskHandler>,
) -> TaskRegistry {
    TaskRegistry::new()
        .register("ExtractProblem", extract_problem)
        .register("GenerateGeneratorScript", generate_generator_script)
        .register("GenerateOutputs", generate_outputs)
        .register("ExecuteSubmission", execute_submission)
        .register("GenerateHints", generate_hints)
        .register("DeleteJob", delete_job)
        .register("RecoverOrphanedJobs", recover_orphaned_jobs)
}
