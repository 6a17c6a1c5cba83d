use serde::{Deserialize, Serialize};

/// The flat, single-table wire shape from §6: every stored row carries
/// these reserved attributes, regardless of entity type. Typed repositories
/// (in `judgeflow-store`) convert to and from this envelope; nothing above
/// the store layer should construct one by hand outside of tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "PK")]
    pub pk: String,
    #[serde(rename = "SK")]
    pub sk: String,
    /// Type tag, e.g. `"USR"`, `"PROB"`, `"SGJOB"`.
    pub tp: String,
    /// Entity-specific payload, stored as an opaque JSON map so that the
    /// store crate never needs to know every entity's shape.
    pub dat: serde_json::Value,
    /// Creation time, unix seconds.
    pub crt: i64,
    /// Last-update time, unix seconds.
    pub upd: i64,
    /// Optional TTL, unix seconds; items past this are eligible for
    /// store-side expiry.
    pub ttl: Option<i64>,
    #[serde(rename = "GSI1PK", skip_serializing_if = "Option::is_none")]
    pub gsi1pk: Option<String>,
    #[serde(rename = "GSI1SK", skip_serializing_if = "Option::is_none")]
    pub gsi1sk: Option<String>,
    #[serde(rename = "GSI2PK", skip_serializing_if = "Option::is_none")]
    pub gsi2pk: Option<String>,
    #[serde(rename = "GSI3PK", skip_serializing_if = "Option::is_none")]
    pub gsi3pk: Option<String>,
    #[serde(rename = "GSI3SK", skip_serializing_if = "Option::is_none")]
    pub gsi3sk: Option<String>,
}

impl Item {
    /// Construct a bare item; callers fill in index projections separately
    /// via `with_gsi1`/`with_gsi3` so that "writes that touch an indexed
    /// attribute set the index key in the same put" (§4.1) stays a
    /// property of the call site, not something this type can silently drop.
    pub fn new(pk: impl Into<String>, sk: impl Into<String>, tp: impl Into<String>, dat: serde_json::Value, now: i64) -> Self {
        Self {
            pk: pk.into(),
            sk: sk.into(),
            tp: tp.into(),
            dat,
            crt: now,
            upd: now,
            ttl: None,
            gsi1pk: None,
            gsi1sk: None,
            gsi2pk: None,
            gsi3pk: None,
            gsi3sk: None,
        }
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Option<i64>) -> Self {
        self.ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_gsi1(mut self, pk: impl Into<String>, sk: impl Into<String>) -> Self {
        self.gsi1pk = Some(pk.into());
        self.gsi1sk = Some(sk.into());
        self
    }

    #[must_use]
    pub fn with_gsi2(mut self, pk: impl Into<String>) -> Self {
        self.gsi2pk = Some(pk.into());
        self
    }

    #[must_use]
    pub fn with_gsi3(mut self, pk: impl Into<String>, sk: impl Into<String>) -> Self {
        self.gsi3pk = Some(pk.into());
        self.gsi3sk = Some(sk.into());
        self
    }

    /// Deserialize `dat` into a typed payload.
    pub fn payload<T: serde::de::DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_value(self.dat.clone())
    }
}
