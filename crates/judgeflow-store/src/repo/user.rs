use crate::{Condition, Error, IndexQuery, IndexSelector, StoreBackend};
use judgeflow_types::{Item, Keys, User};
use std::sync::Arc;

/// Access patterns over `User` (§3): by id, by email (GSI1), by OAuth
/// id (GSI2, hash-only).
pub struct UserRepository {
    backend: Arc<dyn StoreBackend>,
}

fn to_item(user: &User, now: i64) -> Item {
    let dat = serde_json::to_value(user).expect("User always serializes");
    Item::new(Keys::user_pk(&user.user_id), Keys::meta_sk(), "USR", dat, now)
        .with_gsi1(Keys::user_by_email_gsi1pk(&user.email), Keys::meta_sk())
        .with_gsi2(Keys::user_by_oauth_gsi2pk(&user.external_oauth_id))
}

impl UserRepository {
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self { backend }
    }

    pub async fn create(&self, user: &User, now: i64) -> Result<(), Error> {
        self.backend.put_item(to_item(user, now), Condition::NotExists).await
    }

    pub async fn get(&self, user_id: &str) -> Result<Option<User>, Error> {
        match self.backend.get_item(&Keys::user_pk(user_id), &Keys::meta_sk()).await? {
            Some(item) => Ok(Some(item.payload()?)),
            None => Ok(None),
        }
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        let page = self
            .backend
            .query(IndexQuery::new(IndexSelector::Gsi1, Keys::user_by_email_gsi1pk(email)).with_limit(1))
            .await?;
        page.items.first().map(Item::payload).transpose().map_err(Error::from)
    }

    pub async fn get_by_oauth_id(&self, oauth_id: &str) -> Result<Option<User>, Error> {
        let page = self
            .backend
            .query(IndexQuery::new(IndexSelector::Gsi2, Keys::user_by_oauth_gsi2pk(oauth_id)).with_limit(1))
            .await?;
        page.items.first().map(Item::payload).transpose().map_err(Error::from)
    }

    pub async fn update(&self, user: &User, now: i64) -> Result<(), Error> {
        self.backend.put_item(to_item(user, now), Condition::Exists).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryStore;

    fn user() -> User {
        User::new("u1", "a@b.com", "oauth-1", "plan-free")
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let repo = UserRepository::new(Arc::new(InMemoryStore::new()));
        repo.create(&user(), 1).await.unwrap();
        let got = repo.get("u1").await.unwrap().unwrap();
        assert_eq!(got.email, "a@b.com");
    }

    #[tokio::test]
    async fn lookup_by_email_uses_gsi1() {
        let repo = UserRepository::new(Arc::new(InMemoryStore::new()));
        repo.create(&user(), 1).await.unwrap();
        let got = repo.get_by_email("a@b.com").await.unwrap().unwrap();
        assert_eq!(got.user_id, "u1");
    }

    #[tokio::test]
    async fn lookup_by_oauth_id_uses_gsi2() {
        let repo = UserRepository::new(Arc::new(InMemoryStore::new()));
        repo.create(&user(), 1).await.unwrap();
        let got = repo.get_by_oauth_id("oauth-1").await.unwrap().unwrap();
        assert_eq!(got.user_id, "u1");
    }

    #[tokio::test]
    async fn create_twice_is_a_precondition_failure() {
        let repo = UserRepository::new(Arc::new(InMemoryStore::new()));
        repo.create(&user(), 1).await.unwrap();
        let err = repo.create(&user(), 2).await.unwrap_err();
        assert!(matches!(err, Error::PreconditionFailed { .. }));
    }
}
