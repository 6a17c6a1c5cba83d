use crate::{Condition, Error, StoreBackend};
use judgeflow_types::{Item, Keys, Plan};
use std::sync::Arc;

/// Plans are created once and rarely mutated (§3 "Lifecycle").
pub struct PlanRepository {
    backend: Arc<dyn StoreBackend>,
}

fn to_item(plan: &Plan, now: i64) -> Item {
    let dat = serde_json::to_value(plan).expect("Plan always serializes");
    Item::new(Keys::plan_pk(&plan.plan_id), Keys::meta_sk(), "PLAN", dat, now)
}

impl PlanRepository {
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self { backend }
    }

    pub async fn create(&self, plan: &Plan, now: i64) -> Result<(), Error> {
        self.backend.put_item(to_item(plan, now), Condition::NotExists).await
    }

    pub async fn get(&self, plan_id: &str) -> Result<Option<Plan>, Error> {
        match self.backend.get_item(&Keys::plan_pk(plan_id), Keys::meta_sk()).await? {
            Some(item) => Ok(Some(item.payload()?)),
            None => Ok(None),
        }
    }

    pub async fn update(&self, plan: &Plan, now: i64) -> Result<(), Error> {
        self.backend.put_item(to_item(plan, now), Condition::Exists).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryStore;

    fn plan() -> Plan {
        Plan {
            plan_id: "free".into(),
            name: "Free".into(),
            max_hints_per_day: 5,
            max_executions_per_day: 10,
            max_problems: 50,
            can_view_all: false,
            can_register: false,
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let repo = PlanRepository::new(Arc::new(InMemoryStore::new()));
        repo.create(&plan(), 1).await.unwrap();
        let got = repo.get("free").await.unwrap().unwrap();
        assert_eq!(got.max_hints_per_day, 5);
    }

    #[tokio::test]
    async fn update_requires_existing_plan() {
        let repo = PlanRepository::new(Arc::new(InMemoryStore::new()));
        let err = repo.update(&plan(), 1).await.unwrap_err();
        assert!(matches!(err, Error::PreconditionFailed { .. }));
    }
}
