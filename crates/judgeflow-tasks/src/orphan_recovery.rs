use crate::Error;
use judgeflow_jobs::{ProblemExtractionJobService, ScriptGenerationJobService};
use judgeflow_store::{IndexQuery, IndexSelector, StoreBackend};
use judgeflow_types::{Item, JobStatus, Keys, ProblemExtractionJob, ScriptGenerationJob, TaskOutcome};
use std::sync::Arc;

const ORPHAN_REASON: &str = "orphaned";

/// `RecoverOrphanedJobs` (§4.10): sweeps both job kinds for rows stuck in
/// `PROCESSING` whose last update is older than the configured threshold
/// and fails them with reason "orphaned". Queries the GSI1 status bucket
/// directly rather than through `ScriptGenerationJobRepository`/
/// `ProblemExtractionJobRepository`, since only the raw `Item.upd`
/// timestamp carries the staleness signal those repositories discard.
pub struct OrphanRecoveryTask {
    backend: Arc<dyn StoreBackend>,
    sg_jobs: Arc<ScriptGenerationJobService>,
    pe_jobs: Arc<ProblemExtractionJobService>,
    threshold_seconds: u64,
}

impl OrphanRecoveryTask {
    pub fn new(backend: Arc<dyn StoreBackend>, sg_jobs: Arc<ScriptGenerationJobService>, pe_jobs: Arc<ProblemExtractionJobService>, threshold_seconds: u64) -> Self {
        Self { backend, sg_jobs, pe_jobs, threshold_seconds }
    }

    async fn stale_items(&self, gsi1pk: &str, now: i64) -> Result<Vec<Item>, Error> {
        let mut stale = Vec::new();
        let mut cursor = None;
        loop {
            let mut query = IndexQuery::new(IndexSelector::Gsi1, gsi1pk).with_limit(100);
            if let Some(c) = cursor.take() {
                query = query.with_cursor(c);
            }
            let page = self.backend.query(query).await?;
            let done = page.next_cursor.is_none();
            stale.extend(page.items.into_iter().filter(|item| now - item.upd > self.threshold_seconds as i64));
            if done {
                break;
            }
            cursor = page.next_cursor;
        }
        Ok(stale)
    }

    async fn recover_script_generation(&self, now: i64) -> Result<u32, Error> {
        let items = self.stale_items(&Keys::sgjob_status_gsi1pk(JobStatus::Processing.as_str()), now).await?;
        let mut recovered = 0;
        for item in items {
            let job: ScriptGenerationJob = item.payload()?;
            if job.status != JobStatus::Processing {
                continue;
            }
            match self.sg_jobs.fail(job, ORPHAN_REASON.to_string(), now).await {
                Ok(_) => recovered += 1,
                Err(judgeflow_jobs::Error::Store(judgeflow_store::Error::PreconditionFailed { .. })) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(recovered)
    }

    async fn recover_problem_extraction(&self, now: i64) -> Result<u32, Error> {
        let items = self.stale_items(&Keys::pejob_status_gsi1pk(JobStatus::Processing.as_str()), now).await?;
        let mut recovered = 0;
        for item in items {
            let job: ProblemExtractionJob = item.payload()?;
            if job.status != JobStatus::Processing {
                continue;
            }
            match self.pe_jobs.fail(job, ORPHAN_REASON.to_string(), now).await {
                Ok(_) => recovered += 1,
                Err(judgeflow_jobs::Error::Store(judgeflow_store::Error::PreconditionFailed { .. })) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(recovered)
    }

    async fn run(&self, now: i64) -> Result<TaskOutcome, Error> {
        let sg = self.recover_script_generation(now).await?;
        let pe = self.recover_problem_extraction(now).await?;
        if sg + pe > 0 {
            tracing::info!(script_generation = sg, problem_extraction = pe, "recovered orphaned jobs");
        }
        Ok(TaskOutcome::Success)
    }
}

#[async_trait::async_trait]
impl judgeflow_worker::TaskHandler for OrphanRecoveryTask {
    async fn handle(&self, _payload: &serde_json::Value) -> TaskOutcome {
        let now = crate::unix_now();
        match self.run(now).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_retryable() => TaskOutcome::Retry(e.to_string()),
            Err(e) => TaskOutcome::Terminal(e.to_string()),
        }
    }
}
