use crate::{Condition, Error, IndexQuery, IndexSelector, StoreBackend};
use judgeflow_types::{Item, Keys, UsageLog};
use std::sync::Arc;

/// `UsageLog` append + count (§4.2). The rate-limit decision and
/// caching live in `judgeflow-usage`; this repository only knows how to
/// write a log row and count a day's partition.
pub struct UsageLogRepository {
    backend: Arc<dyn StoreBackend>,
}

impl UsageLogRepository {
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self { backend }
    }

    /// Idempotency key is `ULOG#{unix_ts}#{action}` (§4.2 step 5);
    /// callers retry with a fresh timestamp on collision.
    pub async fn append(&self, log: &UsageLog, unix_ts: i64) -> Result<(), Error> {
        let dat = serde_json::to_value(log).expect("UsageLog always serializes");
        let pk = Keys::usage_pk(&log.user_id, &log.date);
        let sk = Keys::usage_sk(unix_ts, log.action.as_str());
        let item = Item::new(pk, sk, "ULOG", dat, log.crt).with_ttl(Some(log.ttl));
        self.backend.put_item(item, Condition::NotExists).await
    }

    /// `COUNT`-only query on the day's partition (§4.2 step 3).
    pub async fn count(&self, user_id: &str, date: &str) -> Result<u64, Error> {
        let query = IndexQuery::new(IndexSelector::Primary, Keys::usage_pk(user_id, date)).with_limit(usize::MAX);
        self.backend.count(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryStore;
    use judgeflow_types::UsageAction;

    #[tokio::test]
    async fn count_reflects_appended_rows() {
        let repo = UsageLogRepository::new(Arc::new(InMemoryStore::new()));
        repo.append(&UsageLog::new("u1", "20260727", UsageAction::Execution, 1), 1).await.unwrap();
        repo.append(&UsageLog::new("u1", "20260727", UsageAction::Hint, 2), 2).await.unwrap();
        assert_eq!(repo.count("u1", "20260727").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn counts_are_scoped_to_the_day_partition() {
        let repo = UsageLogRepository::new(Arc::new(InMemoryStore::new()));
        repo.append(&UsageLog::new("u1", "20260727", UsageAction::Execution, 1), 1).await.unwrap();
        repo.append(&UsageLog::new("u1", "20260728", UsageAction::Execution, 2), 2).await.unwrap();
        assert_eq!(repo.count("u1", "20260727").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn colliding_idempotency_key_is_a_precondition_failure() {
        let repo = UsageLogRepository::new(Arc::new(InMemoryStore::new()));
        repo.append(&UsageLog::new("u1", "20260727", UsageAction::Execution, 1), 100).await.unwrap();
        let err = repo.append(&UsageLog::new("u1", "20260727", UsageAction::Execution, 1), 100).await.unwrap_err();
        assert!(matches!(err, Error::PreconditionFailed { .. }));
    }
}
