//! Test-case blob storage (§4.3).
//!
//! Large test-case bodies live outside the table in an object store, keyed
//! `testcases/{platform}/{problem_id}/testcases.json.gz` (§6). This
//! crate owns the gzip framing and the compensating retry that keeps the
//! blob and the Problem's denormalized `tcc` count converging.

mod error;
mod manifest;
mod object_store;

#[cfg(feature = "s3")]
mod s3;

pub use error::Error;
pub use manifest::{TestCase, TestCaseManifest};
pub use object_store::{InMemoryObjectStore, ObjectStore};

#[cfg(feature = "s3")]
pub use s3::S3ObjectStore;

use judgeflow_types::Keys;
use std::sync::Arc;

/// Reads and writes the compressed manifest for one problem (§4.3:
/// "A read returns the decompressed list; a write replaces it atomically").
pub struct TestCaseStore {
    object_store: Arc<dyn ObjectStore>,
    gzip_level: u32,
}

impl TestCaseStore {
    pub fn new(object_store: Arc<dyn ObjectStore>, gzip_level: u32) -> Self {
        Self { object_store, gzip_level }
    }

    pub async fn read(&self, platform: &str, problem_id: &str) -> Result<Option<TestCaseManifest>, Error> {
        let key = Keys::testcase_object_key(platform, problem_id);
        match self.object_store.get(&key).await? {
            Some(bytes) => Ok(Some(manifest::decompress(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Write-then-swap: the new blob is written under the same key with
    /// object versioning handling the atomic replace (§4.3).
    pub async fn write(&self, platform: &str, problem_id: &str, manifest: &TestCaseManifest) -> Result<(), Error> {
        let key = Keys::testcase_object_key(platform, problem_id);
        let bytes = manifest::compress(manifest, self.gzip_level)?;
        self.object_store.put(&key, bytes).await
    }

    pub async fn delete(&self, platform: &str, problem_id: &str) -> Result<(), Error> {
        let key = Keys::testcase_object_key(platform, problem_id);
        self.object_store.delete(&key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(n: usize) -> TestCaseManifest {
        TestCaseManifest {
            cases: (0..n)
                .map(|i| TestCase {
                    id: i.to_string(),
                    input: format!("in-{i}"),
                    output: format!("out-{i}"),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let store = TestCaseStore::new(Arc::new(InMemoryObjectStore::new()), 6);
        store.write("baekjoon", "1000", &manifest(3)).await.unwrap();
        let read = store.read("baekjoon", "1000").await.unwrap().unwrap();
        assert_eq!(read.cases.len(), 3);
        assert_eq!(read.cases[1].input, "in-1");
    }

    #[tokio::test]
    async fn missing_manifest_reads_as_none() {
        let store = TestCaseStore::new(Arc::new(InMemoryObjectStore::new()), 6);
        assert!(store.read("baekjoon", "9999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn write_replaces_the_whole_manifest() {
        let store = TestCaseStore::new(Arc::new(InMemoryObjectStore::new()), 6);
        store.write("baekjoon", "1000", &manifest(5)).await.unwrap();
        store.write("baekjoon", "1000", &manifest(2)).await.unwrap();
        let read = store.read("baekjoon", "1000").await.unwrap().unwrap();
        assert_eq!(read.cases.len(), 2);
    }
}
