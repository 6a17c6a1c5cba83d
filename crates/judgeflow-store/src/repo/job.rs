use crate::{Condition, Error, IndexQuery, IndexSelector, Page, StoreBackend};
use judgeflow_types::{Item, JobStatus, Keys, ProblemExtractionJob, ScriptGenerationJob};
use std::sync::Arc;

/// Shared conditional-transition helper: the store layer is responsible for
/// making job status transitions conditional on the current state (§4.7). A
/// `PreconditionFailed` here means another worker already progressed the
/// job.
async fn transition(
    backend: &dyn StoreBackend,
    pk: &str,
    expected_current: JobStatus,
    item: Item,
) -> Result<(), Error> {
    backend
        .put_item(
            item,
            Condition::AttributeEquals {
                name: "status".to_string(),
                value: serde_json::to_value(expected_current).expect("JobStatus always serializes"),
            },
        )
        .await
        .map_err(|e| match e {
            Error::PreconditionFailed { .. } => Error::PreconditionFailed {
                pk: pk.to_string(),
                sk: Keys::meta_sk().to_string(),
                condition: format!("status = {expected_current:?}"),
            },
            other => other,
        })
}

pub struct ScriptGenerationJobRepository {
    backend: Arc<dyn StoreBackend>,
}

fn sgjob_item(job: &ScriptGenerationJob, now: i64) -> Item {
    let dat = serde_json::to_value(job).expect("ScriptGenerationJob always serializes");
    Item::new(Keys::sgjob_pk(&job.job_id), Keys::meta_sk(), "SGJOB", dat, now)
        .with_gsi1(Keys::sgjob_status_gsi1pk(job.status.as_str()), now.to_string())
}

impl ScriptGenerationJobRepository {
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self { backend }
    }

    pub async fn create(&self, job: &ScriptGenerationJob, now: i64) -> Result<(), Error> {
        self.backend.put_item(sgjob_item(job, now), Condition::NotExists).await
    }

    pub async fn get(&self, job_id: &str) -> Result<Option<ScriptGenerationJob>, Error> {
        match self.backend.get_item(&Keys::sgjob_pk(job_id), Keys::meta_sk()).await? {
            Some(item) => Ok(Some(item.payload()?)),
            None => Ok(None),
        }
    }

    /// Conditional status transition (§4.7): fails with
    /// `PreconditionFailed` if the job is not currently in `expected_current`.
    pub async fn transition(&self, job: &ScriptGenerationJob, expected_current: JobStatus, now: i64) -> Result<(), Error> {
        let pk = Keys::sgjob_pk(&job.job_id);
        transition(self.backend.as_ref(), &pk, expected_current, sgjob_item(job, now)).await
    }

    pub async fn delete(&self, job_id: &str) -> Result<(), Error> {
        self.backend.delete_item(&Keys::sgjob_pk(job_id), Keys::meta_sk(), Condition::None).await
    }

    pub async fn list_by_status(&self, status: JobStatus, cursor: Option<String>, limit: usize) -> Result<Page<ScriptGenerationJob>, Error> {
        let mut query = IndexQuery::new(IndexSelector::Gsi1, Keys::sgjob_status_gsi1pk(status.as_str())).descending().with_limit(limit);
        if let Some(cursor) = cursor {
            query = query.with_cursor(cursor);
        }
        let page = self.backend.query(query).await?;
        Ok(Page {
            items: page.items.iter().map(Item::payload).collect::<Result<_, _>>()?,
            next_cursor: page.next_cursor,
        })
    }
}

pub struct ProblemExtractionJobRepository {
    backend: Arc<dyn StoreBackend>,
}

fn pejob_item(job: &ProblemExtractionJob, now: i64) -> Item {
    let dat = serde_json::to_value(job).expect("ProblemExtractionJob always serializes");
    Item::new(Keys::pejob_pk(&job.job_id), Keys::meta_sk(), "PEJOB", dat, now)
        .with_gsi1(Keys::pejob_status_gsi1pk(job.status.as_str()), now.to_string())
}

impl ProblemExtractionJobRepository {
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self { backend }
    }

    pub async fn create(&self, job: &ProblemExtractionJob, now: i64) -> Result<(), Error> {
        self.backend.put_item(pejob_item(job, now), Condition::NotExists).await
    }

    pub async fn get(&self, job_id: &str) -> Result<Option<ProblemExtractionJob>, Error> {
        match self.backend.get_item(&Keys::pejob_pk(job_id), Keys::meta_sk()).await? {
            Some(item) => Ok(Some(item.payload()?)),
            None => Ok(None),
        }
    }

    pub async fn transition(&self, job: &ProblemExtractionJob, expected_current: JobStatus, now: i64) -> Result<(), Error> {
        let pk = Keys::pejob_pk(&job.job_id);
        transition(self.backend.as_ref(), &pk, expected_current, pejob_item(job, now)).await
    }

    pub async fn delete(&self, job_id: &str) -> Result<(), Error> {
        self.backend.delete_item(&Keys::pejob_pk(job_id), Keys::meta_sk(), Condition::None).await
    }

    pub async fn list_by_status(&self, status: JobStatus, cursor: Option<String>, limit: usize) -> Result<Page<ProblemExtractionJob>, Error> {
        let mut query = IndexQuery::new(IndexSelector::Gsi1, Keys::pejob_status_gsi1pk(status.as_str())).descending().with_limit(limit);
        if let Some(cursor) = cursor {
            query = query.with_cursor(cursor);
        }
        let page = self.backend.query(query).await?;
        Ok(Page {
            items: page.items.iter().map(Item::payload).collect::<Result<_, _>>()?,
            next_cursor: page.next_cursor,
        })
    }
}
