use crate::Error;
use async_trait::async_trait;
use judgeflow_types::Item;

/// Caller-supplied precondition for a write (§4.1: "All mutations
/// accept a caller-supplied condition ... and fail with `PreconditionFailed`
/// when violated").
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    None,
    Exists,
    NotExists,
    AttributeEquals { name: String, value: serde_json::Value },
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Condition::None => write!(f, "none"),
            Condition::Exists => write!(f, "exists"),
            Condition::NotExists => write!(f, "not-exists"),
            Condition::AttributeEquals { name, .. } => write!(f, "{name}=<value>"),
        }
    }
}

impl Condition {
    /// Checked against the item currently stored under the target key, if
    /// any. Implementations call this before committing a write or delete.
    pub fn check(&self, pk: &str, sk: &str, existing: Option<&Item>) -> Result<(), Error> {
        let ok = match self {
            Condition::None => true,
            Condition::Exists => existing.is_some(),
            Condition::NotExists => existing.is_none(),
            Condition::AttributeEquals { name, value } => existing
                .map(|item| item.dat.get(name) == Some(value))
                .unwrap_or(false),
        };
        if ok {
            Ok(())
        } else {
            Err(Error::PreconditionFailed {
                pk: pk.to_string(),
                sk: sk.to_string(),
                condition: self.to_string(),
            })
        }
    }
}

/// Which key pair a query ranges over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSelector {
    Primary,
    Gsi1,
    Gsi2,
    Gsi3,
}

/// A single range query against the primary key or one of the three
/// secondary indexes (§3, §4.1).
#[derive(Debug, Clone)]
pub struct IndexQuery {
    pub index: IndexSelector,
    pub partition_key: String,
    pub descending: bool,
    pub limit: usize,
    pub cursor: Option<String>,
}

impl IndexQuery {
    pub fn new(index: IndexSelector, partition_key: impl Into<String>) -> Self {
        Self {
            index,
            partition_key: partition_key.into(),
            descending: false,
            limit: 50,
            cursor: None,
        }
    }

    #[must_use]
    pub fn descending(mut self) -> Self {
        self.descending = true;
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }
}

/// A page of query results with an opaque, stable continuation cursor
/// (§4.1: "all listings return `(items, next_cursor)`").
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

/// The store capability: everything above it (repositories, tasks) talks
/// only through this trait, never through a concrete backend (§9,
/// "from dynamic dispatch and duck typing to explicit capabilities").
#[async_trait]
pub trait StoreBackend: Send + Sync {
    async fn put_item(&self, item: Item, condition: Condition) -> Result<(), Error>;
    async fn get_item(&self, pk: &str, sk: &str) -> Result<Option<Item>, Error>;
    async fn delete_item(&self, pk: &str, sk: &str, condition: Condition) -> Result<(), Error>;
    async fn query(&self, query: IndexQuery) -> Result<Page<Item>, Error>;
    /// Count-only query, used by the usage ledger hot path (§4.2 step 3)
    /// to avoid materializing rows just to size them.
    async fn count(&self, query: IndexQuery) -> Result<u64, Error>;
}
