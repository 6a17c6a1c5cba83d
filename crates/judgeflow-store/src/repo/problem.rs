use crate::{Condition, Error, IndexQuery, IndexSelector, Page, StoreBackend};
use judgeflow_types::{Item, Keys, Problem};
use std::sync::Arc;

/// Access patterns over `Problem` (§3, §4.1): by `(platform, id)`, and
/// status-indexed listings via the sparse GSI3 projection.
///
/// Soft-deleted problems are unreachable from every read method here
/// (`Problem::is_reachable`); there is no re-hydration API (§9 open
/// questions).
pub struct ProblemRepository {
    backend: Arc<dyn StoreBackend>,
}

fn to_item(problem: &Problem, now: i64) -> Item {
    let dat = serde_json::to_value(problem).expect("Problem always serializes");
    let pk = Keys::problem_pk(&problem.platform.to_string(), &problem.problem_id);
    Item::new(pk, Keys::meta_sk(), "PROB", dat, now)
        .with_gsi3(Keys::problem_status_gsi3pk(problem.completed), now.to_string())
}

impl ProblemRepository {
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self { backend }
    }

    pub async fn create(&self, problem: &Problem, now: i64) -> Result<(), Error> {
        self.backend.put_item(to_item(problem, now), Condition::NotExists).await
    }

    pub async fn get(&self, platform: &str, problem_id: &str) -> Result<Option<Problem>, Error> {
        match self.backend.get_item(&Keys::problem_pk(platform, problem_id), Keys::meta_sk()).await? {
            Some(item) => {
                let problem: Problem = item.payload()?;
                Ok(problem.is_reachable().then_some(problem))
            }
            None => Ok(None),
        }
    }

    /// Writes-through-same-item update (§3 invariant 2: "GSI3
    /// projection MUST be set on every Problem write; status transitions
    /// MUST rewrite it").
    pub async fn update(&self, problem: &Problem, now: i64) -> Result<(), Error> {
        self.backend.put_item(to_item(problem, now), Condition::Exists).await
    }

    pub async fn delete(&self, platform: &str, problem_id: &str) -> Result<(), Error> {
        self.backend.delete_item(&Keys::problem_pk(platform, problem_id), Keys::meta_sk(), Condition::Exists).await
    }

    /// Newest-first listing by status (§4.1: "Status-indexed listings
    /// (GSI3) return items newest-first").
    pub async fn list_by_status(&self, completed: bool, cursor: Option<String>, limit: usize) -> Result<Page<Problem>, Error> {
        let mut query = IndexQuery::new(IndexSelector::Gsi3, Keys::problem_status_gsi3pk(completed)).descending().with_limit(limit);
        if let Some(cursor) = cursor {
            query = query.with_cursor(cursor);
        }
        let page = self.backend.query(query).await?;
        let items = page
            .items
            .iter()
            .map(Item::payload::<Problem>)
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter(Problem::is_reachable)
            .collect();
        Ok(Page { items, next_cursor: page.next_cursor })
    }
}
