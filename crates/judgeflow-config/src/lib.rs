//! Process configuration (§6 "Configuration").
//!
//! A `Config` is built from a TOML file with built-in defaults for every
//! field, then individual settings can be overridden by environment
//! variables (`JUDGEFLOW_<SECTION>_<KEY>`), following the env-override
//! getters in `dashflow-observability`'s websocket server config.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

mod env;

pub use env::EnvOverlay;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid environment override {var}={value}: {reason}")]
    BadEnvOverride { var: String, value: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Defaults to `min(2 * cpus + 1, 16)` (§4.5) when unset.
    pub pool_size: Option<usize>,
    pub queues: Vec<String>,
    pub shutdown_grace_seconds: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            pool_size: None,
            queues: vec![
                "jobs".into(),
                "execution".into(),
                "generation".into(),
                "ai".into(),
                "maintenance".into(),
            ],
            shutdown_grace_seconds: 120,
        }
    }
}

impl WorkerConfig {
    pub fn resolved_pool_size(&self) -> usize {
        self.pool_size.unwrap_or_else(|| {
            let cpus = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
            (2 * cpus + 1).min(16)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerConfig {
    pub visibility_timeout_seconds: HashMap<String, u64>,
    pub backpressure_depth: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        let mut visibility_timeout_seconds = HashMap::new();
        visibility_timeout_seconds.insert("ai".to_string(), 25 * 60);
        visibility_timeout_seconds.insert("execution".to_string(), 5 * 60);
        visibility_timeout_seconds.insert("generation".to_string(), 20 * 60);
        visibility_timeout_seconds.insert("jobs".to_string(), 10 * 60);
        visibility_timeout_seconds.insert("maintenance".to_string(), 2 * 60);
        Self {
            visibility_timeout_seconds,
            backpressure_depth: 10_000,
        }
    }
}

impl BrokerConfig {
    pub fn visibility_timeout(&self, queue: &str) -> Duration {
        let secs = self.visibility_timeout_seconds.get(queue).copied().unwrap_or(300);
        Duration::from_secs(secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRetryConfig {
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub backoff_cap_seconds: u64,
}

impl Default for TaskRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_seconds: 60,
            backoff_cap_seconds: 30 * 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RateLimitConfig {
    pub cache_ttl_seconds: u64,
}

impl RateLimitConfig {
    const DEFAULT_TTL: u64 = 30;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    pub temperature: f64,
    pub reasoning_effort: String,
    pub verbosity: String,
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "default".to_string(),
            temperature: 0.0,
            reasoning_effort: "high".to_string(),
            verbosity: "low".to_string(),
            timeout_seconds: 30 * 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCasesConfig {
    pub max_count: u32,
    pub gzip_level: u32,
}

impl Default for TestCasesConfig {
    fn default() -> Self {
        Self {
            max_count: 100,
            gzip_level: 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrphanRecoveryConfig {
    pub interval_seconds: u64,
    pub threshold_seconds: u64,
}

impl Default for OrphanRecoveryConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 15 * 60,
            threshold_seconds: 30 * 60,
        }
    }
}

/// Top-level process configuration. `Default` gives every
/// default value (§6); `from_file` overlays a TOML file; `apply_env`
/// overlays environment variables on top of that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub task: HashMap<String, TaskRetryConfig>,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub testcases: TestCasesConfig,
    #[serde(default)]
    pub orphan_recovery: OrphanRecoveryConfig,
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Overlay `JUDGEFLOW_*` environment variables on top of an already
    /// loaded config. Unrecognized or absent variables are left untouched.
    pub fn apply_env(mut self) -> Result<Self, ConfigError> {
        env::apply(&mut self)?;
        Ok(self)
    }

    pub fn task_retry(&self, task_name: &str) -> TaskRetryConfig {
        self.task.get(task_name).cloned().unwrap_or_default()
    }

    pub fn rate_limit_cache_ttl(&self) -> Duration {
        let secs = if self.rate_limit.cache_ttl_seconds == 0 {
            RateLimitConfig::DEFAULT_TTL
        } else {
            self.rate_limit.cache_ttl_seconds
        };
        Duration::from_secs(secs)
    }
}
