use crate::{Condition, Error, IndexQuery, IndexSelector, Page, StoreBackend};
use judgeflow_types::{Item, Keys, SearchHistory};
use std::sync::Arc;

/// `SearchHistory` is immutable except for `hints`, written at most once
/// (§3 "Lifecycle"). The public feed is a sparse GSI1 projection set
/// iff `pub=true` (§3 invariant 3).
pub struct SearchHistoryRepository {
    backend: Arc<dyn StoreBackend>,
}

fn to_item(history: &SearchHistory, now: i64) -> Item {
    let dat = serde_json::to_value(history).expect("SearchHistory always serializes");
    let pk = Keys::history_pk(&history.email, &history.platform, &history.problem_number);
    let sk = Keys::history_sk(history.history_id);
    let mut item = Item::new(pk, sk.clone(), "SHIST", dat, now);
    if history.public {
        item = item.with_gsi1(Keys::public_history_gsi1pk(), sk);
    }
    item
}

impl SearchHistoryRepository {
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self { backend }
    }

    pub async fn create(&self, history: &SearchHistory, now: i64) -> Result<(), Error> {
        self.backend.put_item(to_item(history, now), Condition::NotExists).await
    }

    pub async fn get(&self, email: &str, platform: &str, problem_number: &str, history_id: i64) -> Result<Option<SearchHistory>, Error> {
        let pk = Keys::history_pk(email, platform, problem_number);
        let sk = Keys::history_sk(history_id);
        match self.backend.get_item(&pk, &sk).await? {
            Some(item) => Ok(Some(item.payload()?)),
            None => Ok(None),
        }
    }

    /// Sets `hints` exactly once (§4.6.5: a second call observes hints
    /// already present and is a no-op at the task layer; this method itself
    /// just performs the write, unconditionally of races, since only one
    /// `GenerateHints` run is expected to reach it per history row).
    pub async fn set_hints(&self, history: &SearchHistory, now: i64) -> Result<(), Error> {
        self.backend.put_item(to_item(history, now), Condition::Exists).await
    }

    /// Toggling `public` adds/removes the GSI1 projection atomically with
    /// the base item (§3 invariant 3) because both are set in the same
    /// `put_item` call via `to_item`.
    pub async fn set_public(&self, history: &SearchHistory, now: i64) -> Result<(), Error> {
        self.backend.put_item(to_item(history, now), Condition::Exists).await
    }

    /// Newest-first public feed (§8 scenario 5).
    pub async fn list_public(&self, cursor: Option<String>, limit: usize) -> Result<Page<SearchHistory>, Error> {
        let mut query = IndexQuery::new(IndexSelector::Gsi1, Keys::public_history_gsi1pk()).descending().with_limit(limit);
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
