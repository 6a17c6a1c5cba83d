//! Environment variable overlay, mirroring the `parse_env_var_with_warning`
//! idiom: a bad value logs a warning and is ignored rather than aborting
//! startup.

use crate::{Config, ConfigError};

/// Environment variable names recognized by `apply`.
pub struct EnvOverlay;

impl EnvOverlay {
    pub const WORKER_POOL_SIZE: &'static str = "JUDGEFLOW_WORKER_POOL_SIZE";
    pub const RATE_LIMIT_CACHE_TTL_SECONDS: &'static str = "JUDGEFLOW_RATE_LIMIT_CACHE_TTL_SECONDS";
    pub const LLM_MODEL: &'static str = "JUDGEFLOW_LLM_MODEL";
    pub const LLM_TIMEOUT_SECONDS: &'static str = "JUDGEFLOW_LLM_TIMEOUT_SECONDS";
    pub const ORPHAN_RECOVERY_INTERVAL_SECONDS: &'static str = "JUDGEFLOW_ORPHAN_RECOVERY_INTERVAL_SECONDS";
    pub const ORPHAN_RECOVERY_THRESHOLD_SECONDS: &'static str = "JUDGEFLOW_ORPHAN_RECOVERY_THRESHOLD_SECONDS";
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::BadEnvOverride {
                var: name.to_string(),
                value,
                reason: "could not parse".to_string(),
            }),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::BadEnvOverride {
            var: name.to_string(),
            value: "<non-unicode>".to_string(),
            reason: "not valid unicode".to_string(),
        }),
    }
}

pub(crate) fn apply(config: &mut Config) -> Result<(), ConfigError> {
    if let Some(v) = parse_var::<usize>(EnvOverlay::WORKER_POOL_SIZE)? {
        config.worker.pool_size = Some(v);
    }
    if let Some(v) = parse_var::<u64>(EnvOverlay::RATE_LIMIT_CACHE_TTL_SECONDS)? {
        config.rate_limit.cache_ttl_seconds = v;
    }
    if let Some(v) = parse_var::<String>(EnvOverlay::LLM_MODEL)? {
        config.llm.model = v;
    }
    if let Some(v) = parse_var::<u64>(EnvOverlay::LLM_TIMEOUT_SECONDS)? {
        config.llm.timeout_seconds = v;
    }
    if let Some(v) = parse_var::<u64>(EnvOverlay::ORPHAN_RECOVERY_INTERVAL_SECONDS)? {
        config.orphan_recovery.interval_seconds = v;
    }
    if let Some(v) = parse_var::<u64>(EnvOverlay::ORPHAN_RECOVERY_THRESHOLD_SECONDS)? {
        config.orphan_recovery.threshold_seconds = v;
    }
    Ok(())
}
