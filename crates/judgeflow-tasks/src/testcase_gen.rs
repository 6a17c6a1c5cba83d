use crate::Error;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::stream::{self, StreamExt};
use judgeflow_runner::{Language, RunResult, SandboxRunner};
use judgeflow_testcases::TestCase;
use std::sync::Arc;
use std::time::Duration;

/// Decodes the stored reference solution (§3: "Base64-encoded
/// reference solution source") into UTF-8 source text.
pub(crate) fn decode_reference_solution(reference_solution_b64: &str) -> Result<String, Error> {
    let bytes = STANDARD.decode(reference_solution_b64).map_err(|e| Error::Validation(format!("invalid reference solution encoding: {e}")))?;
    String::from_utf8(bytes).map_err(|e| Error::Validation(format!("reference solution is not valid UTF-8: {e}")))
}

/// Runs the reference solution against each input with bounded
/// concurrency (§5: "per-task concurrency cap, default 8"), the same
/// `buffer_unordered`-over-a-semaphore shape used for parallel evaluation
/// elsewhere in this workspace. A per-input failure does not abort the
/// batch; it is reported alongside the successes.
pub(crate) async fn generate_outputs(
    runner: Arc<dyn SandboxRunner>,
    reference_code: &str,
    language: Language,
    inputs: Vec<String>,
    timeout: Duration,
    concurrency: usize,
) -> Vec<(String, Result<RunResult, Error>)> {
    let tasks = inputs.into_iter().map(|input| {
        let runner = runner.clone();
        let reference_code = reference_code.to_string();
        async move {
            let result = runner.run(&reference_code, language, &input, timeout, None).await.map_err(Error::from);
            (input, result)
        }
    });
    stream::iter(tasks).buffer_unordered(concurrency.max(1)).collect().await
}

/// Builds `{id, input, output}` test cases from successful runs, numbering
/// them in input order. Inputs whose run failed or timed out are dropped
/// from the manifest; the caller decides whether that means `needs_review`.
pub(crate) fn to_test_cases(results: Vec<(String, Result<RunResult, Error>)>) -> (Vec<TestCase>, u32) {
    let mut cases = Vec::with_capacity(results.len());
    let mut failures = 0u32;
    for (idx, (input, result)) in results.into_iter().enumerate() {
        match result {
            Ok(run) if run.success() => cases.push(TestCase { id: idx.to_string(), input, output: run.stdout }),
            _ => failures += 1,
        }
    }
    (cases, failures)
}
