use crate::Error;
use async_trait::async_trait;
use dashmap::DashMap;

/// Versioned blob capability (§4.9): `put/get/head/delete`. `put`
/// always replaces the whole object; there is no partial update.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), Error>;
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error>;
    async fn head(&self, key: &str) -> Result<Option<u64>, Error>;
    async fn delete(&self, key: &str) -> Result<(), Error>;
}

/// In-memory `ObjectStore`, used by tests and local development.
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: DashMap<String, Vec<u8>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), Error> {
        self.objects.insert(key.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.objects.get(key).map(|r| r.value().clone()))
    }

    async fn head(&self, key: &str) -> Result<Option<u64>, Error> {
        Ok(self.objects.get(key).map(|r| r.value().len() as u64))
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        self.objects.remove(key);
        Ok(())
    }
}
