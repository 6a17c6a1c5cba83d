use crate::{Condition, Error, IndexQuery, IndexSelector, Page, StoreBackend};
use judgeflow_types::{Item, JobProgress, Keys};
use std::sync::Arc;

/// Append-only progress log keyed by timestamp within a job's partition
/// (§4.7). Duplicate rows from task re-runs are tolerated (§8).
pub struct JobProgressRepository {
    backend: Arc<dyn StoreBackend>,
}

impl JobProgressRepository {
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self { backend }
    }

    pub async fn append(&self, progress: &JobProgress) -> Result<(), Error> {
        let dat = serde_json::to_value(progress).expect("JobProgress always serializes");
        let pk = Keys::job_progress_pk(progress.job_kind.as_str(), &progress.job_id);
        let sk = Keys::job_progress_sk(progress.crt);
        let item = Item::new(pk, sk, "PROG", dat, progress.crt);
        self.backend.put_item(item, Condition::None).await
    }

    /// Oldest-first progress rows for a job, matching the order they were
    /// written in wall-clock time from a single worker (§5).
    pub async fn list(&self, job_kind: &str, job_id: &str, limit: usize) -> Result<Page<JobProgress>, Error> {
        let query = IndexQuery::new(IndexSelector::Primary, Keys::job_progress_pk(job_kind, job_id)).with_limit(limit);
        let page = self.backend.query(query).await?;
        Ok(Page {
            items: page.items.iter().map(Item::payload).collect::<Result<_, _>>()?,
            next_cursor: page.next_cursor,
        })
    }

    pub async fn delete_all(&self, job_kind: &str, job_id: &str) -> Result<(), Error> {
        let page = self.list(job_kind, job_id, usize::MAX).await?;
        for progress in page.items {
            let sk = Keys::job_progress_sk(progress.crt);
            self.backend
                .delete_item(&Keys::job_progress_pk(job_kind, job_id), &sk, Condition::None)
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryStore;
    use judgeflow_types::{JobKind, ProgressStatus};

    fn progress(crt: i64, step: &str) -> JobProgress {
        JobProgress {
            job_kind: JobKind::ScriptGeneration,
            job_id: "j1".into(),
            step: step.into(),
            message: "working".into(),
            status: ProgressStatus::InProgress,
            crt,
        }
    }

    #[tokio::test]
    async fn appended_rows_are_listed_oldest_first() {
        let repo = JobProgressRepository::new(Arc::new(InMemoryStore::new()));
        repo.append(&progress(1, "fetch")).await.unwrap();
        repo.append(&progress(2, "parse")).await.unwrap();
        let page = repo.list("script-generation", "j1", 10).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].step, "fetch");
        assert_eq!(page.items[1].step, "parse");
    }

    #[tokio::test]
    async fn delete_all_removes_every_row() {
        let repo = JobProgressRepository::new(Arc::new(InMemoryStore::new()));
        repo.append(&progress(1, "fetch")).await.unwrap();
        repo.append(&progress(2, "parse")).await.unwrap();
        repo.delete_all("script-generation", "j1").await.unwrap();
        let page = repo.list("script-generation", "j1", 10).await.unwrap();
        assert!(page.items.is_empty());
    }
}
