use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Source platform for a problem, per §3 (`PROB#{platform}#{problem_id}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Baekjoon,
    Codeforces,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Platform::Baekjoon => "baekjoon",
            Platform::Codeforces => "codeforces",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("unknown platform: {0}")]
pub struct UnknownPlatform(pub String);

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "baekjoon" => Ok(Platform::Baekjoon),
            "codeforces" => Ok(Platform::Codeforces),
            other => Err(UnknownPlatform(other.to_string())),
        }
    }
}

/// The two values the sparse GSI3 projection can take (§3 invariant 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemStatus {
    Draft,
    Completed,
}

/// `Problem` entity payload. Test-case bodies live outside the table (see
/// `judgeflow-testcases`); only the denormalized count `tcc` lives here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub platform: Platform,
    pub problem_id: String,
    pub title: String,
    pub source_url: String,
    pub tags: Vec<String>,
    /// Base64-encoded reference solution source, or a store-side reference
    /// when it exceeds the 256 KB inline threshold (§4.1).
    pub reference_solution_b64: String,
    pub language: String,
    pub constraints: String,
    pub completed: bool,
    pub deleted: bool,
    pub delete_reason: Option<String>,
    pub deleted_at: Option<i64>,
    pub needs_review: bool,
    pub verified: bool,
    /// Denormalized test-case count; must equal the manifest length
    /// (§3 invariant 1).
    pub tcc: u32,
    pub metadata: serde_json::Value,
}

impl Problem {
    pub fn new(platform: Platform, problem_id: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            platform,
            problem_id: problem_id.into(),
            title: String::new(),
            source_url: source_url.into(),
            tags: Vec::new(),
            reference_solution_b64: String::new(),
            language: String::new(),
            constraints: String::new(),
            completed: false,
            deleted: false,
            delete_reason: None,
            deleted_at: None,
            needs_review: false,
            verified: false,
            tcc: 0,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn status(&self) -> ProblemStatus {
        if self.completed {
            ProblemStatus::Completed
        } else {
            ProblemStatus::Draft
        }
    }

    /// §9: soft-deleted problems are unreachable from all read APIs.
    pub fn is_reachable(&self) -> bool {
        !self.deleted
    }
}
