use crate::backend::{Condition, IndexQuery, IndexSelector, Page, StoreBackend};
use crate::Error;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use dashmap::DashMap;
use judgeflow_types::Item;

/// An in-memory `StoreBackend`, used by unit tests and local development. It
/// implements the same index/condition semantics as the real backend so
/// that repository tests do not need a live database.
#[derive(Default)]
pub struct InMemoryStore {
    items: DashMap<(String, String), Item>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn index_key(index: IndexSelector, item: &Item) -> Option<(String, String)> {
        match index {
            IndexSelector::Primary => Some((item.pk.clone(), item.sk.clone())),
            IndexSelector::Gsi1 => {
                let pk = item.gsi1pk.clone()?;
                let sk = item.gsi1sk.clone().unwrap_or_else(|| item.sk.clone());
                Some((pk, sk))
            }
            IndexSelector::Gsi2 => {
                let pk = item.gsi2pk.clone()?;
                Some((pk, item.sk.clone()))
            }
            IndexSelector::Gsi3 => {
                let pk = item.gsi3pk.clone()?;
                let sk = item.gsi3sk.clone().unwrap_or_else(|| item.sk.clone());
                Some((pk, sk))
            }
        }
    }

    fn encode_cursor(sk: &str) -> String {
        BASE64.encode(sk.as_bytes())
    }

    fn decode_cursor(cursor: &str) -> Option<String> {
        BASE64.decode(cursor).ok().and_then(|b| String::from_utf8(b).ok())
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn put_item(&self, item: Item, condition: Condition) -> Result<(), Error> {
        let key = (item.pk.clone(), item.sk.clone());
        let existing = self.items.get(&key).map(|r| r.value().clone());
        condition.check(&item.pk, &item.sk, existing.as_ref())?;
        self.items.insert(key, item);
        Ok(())
    }

    async fn get_item(&self, pk: &str, sk: &str) -> Result<Option<Item>, Error> {
        Ok(self.items.get(&(pk.to_string(), sk.to_string())).map(|r| r.value().clone()))
    }

    async fn delete_item(&self, pk: &str, sk: &str, condition: Condition) -> Result<(), Error> {
        let key = (pk.to_string(), sk.to_string());
        let existing = self.items.get(&key).map(|r| r.value().clone());
        condition.check(pk, sk, existing.as_ref())?;
        self.items.remove(&key);
        Ok(())
    }

    async fn query(&self, query: IndexQuery) -> Result<Page<Item>, Error> {
        let mut matched: Vec<(String, Item)> = self
            .items
            .iter()
            .filter_map(|r| {
                let (pk, sk) = Self::index_key(query.index, r.value())?;
                (pk == query.partition_key).then(|| (sk, r.value().clone()))
            })
            .collect();

        matched.sort_by(|a, b| a.0.cmp(&b.0));
        if query.descending {
            matched.reverse();
        }

        if let Some(cursor) = &query.cursor {
            if let Some(after) = Self::decode_cursor(cursor) {
                matched.retain(|(sk, _)| if query.descending { *sk < after } else { *sk > after });
            }
        }

        let next_cursor = if matched.len() > query.limit {
            matched.truncate(query.limit);
            matched.last().map(|(sk, _)| Self::encode_cursor(sk))
        } else {
            None
        };

        Ok(Page {
            items: matched.into_iter().map(|(_, item)| item).collect(),
            next_cursor,
        })
    }

    async fn count(&self, query: IndexQuery) -> Result<u64, Error> {
        let page = self.query(IndexQuery { limit: usize::MAX, ..query }).await?;
        Ok(page.items.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use judgeflow_types::Item;

    fn item(pk: &str, sk: &str, crt: i64) -> Item {
        Item::new(pk, sk, "test", serde_json::json!({}), crt)
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = InMemoryStore::new();
        store.put_item(item("PK#1", "META", 1), Condition::None).await.unwrap();
        let got = store.get_item("PK#1", "META").await.unwrap();
        assert!(got.is_some());
    }

    #[tokio::test]
    async fn not_exists_condition_rejects_overwrite() {
        let store = InMemoryStore::new();
        store.put_item(item("PK#1", "META", 1), Condition::NotExists).await.unwrap();
        let err = store.put_item(item("PK#1", "META", 2), Condition::NotExists).await.unwrap_err();
        assert!(matches!(err, Error::PreconditionFailed { .. }));
    }

    #[tokio::test]
    async fn exists_condition_rejects_missing_item() {
        let store = InMemoryStore::new();
        let err = store
            .delete_item("PK#1", "META", Condition::Exists)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PreconditionFailed { .. }));
    }

    #[tokio::test]
    async fn query_sorts_ascending_by_default_and_paginates() {
        let store = InMemoryStore::new();
        for i in 0..5 {
            store
                .put_item(item("PK#1", &format!("SK#{i:03}"), i as i64), Condition::None)
                .await
                .unwrap();
        }
        let page = store
            .query(IndexQuery::new(IndexSelector::Primary, "PK#1").with_limit(3))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 3);
        assert!(page.next_cursor.is_some());

        let next = store
            .query(
                IndexQuery::new(IndexSelector::Primary, "PK#1")
                    .with_limit(3)
                    .with_cursor(page.next_cursor.unwrap()),
            )
            .await
            .unwrap();
        assert_eq!(next.items.len(), 2);
        assert!(next.next_cursor.is_none());
    }

    #[tokio::test]
    async fn query_descending_reverses_order() {
        let store = InMemoryStore::new();
        store.put_item(item("PK#1", "SK#1", 1), Condition::None).await.unwrap();
        store.put_item(item("PK#1", "SK#2", 2), Condition::None).await.unwrap();
        let page = store
            .query(IndexQuery::new(IndexSelector::Primary, "PK#1").descending())
            .await
            .unwrap();
        assert_eq!(page.items[0].sk, "SK#2");
        assert_eq!(page.items[1].sk, "SK#1");
    }

    #[tokio::test]
    async fn gsi_query_matches_only_projected_items() {
        let store = InMemoryStore::new();
        let mut visible = item("PK#1", "SK#1", 1);
        visible = visible.with_gsi3("PROB#COMPLETED", "SK#1");
        store.put_item(visible, Condition::None).await.unwrap();
        store.put_item(item("PK#2", "SK#2", 2), Condition::None).await.unwrap();

        let page = store
            .query(IndexQuery::new(IndexSelector::Gsi3, "PROB#COMPLETED"))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].pk, "PK#1");
    }

    #[tokio::test]
    async fn count_does_not_truncate_before_counting() {
        let store = InMemoryStore::new();
        for i in 0..10 {
            store
                .put_item(item("PK#1", &format!("SK#{i:03}"), i as i64), Condition::None)
                .await
                .unwrap();
        }
        let n = store
            .count(IndexQuery::new(IndexSelector::Primary, "PK#1").with_limit(3))
            .await
            .unwrap();
        assert_eq!(n, 10);
    }
}
