use serde::{Deserialize, Serialize};

/// The two metered actions from §4.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageAction {
    Hint,
    Execution,
}

impl UsageAction {
    pub fn as_str(self) -> &'static str {
        match self {
            UsageAction::Hint => "hint",
            UsageAction::Execution => "execution",
        }
    }
}

/// `UsageLog` entity payload (§3). TTL is always `crt + 90 days`
/// (invariant 3 / `USAGE_LOG_TTL_SECONDS`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageLog {
    pub user_id: String,
    pub date: String,
    pub action: UsageAction,
    pub problem_ref: Option<String>,
    pub metadata: serde_json::Value,
    pub crt: i64,
    pub ttl: i64,
}

impl UsageLog {
    pub fn new(user_id: impl Into<String>, date: impl Into<String>, action: UsageAction, now: i64) -> Self {
        Self {
            user_id: user_id.into(),
            date: date.into(),
            action,
            problem_ref: None,
            metadata: serde_json::Value::Null,
            crt: now,
            ttl: now + super::USAGE_LOG_TTL_SECONDS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_is_ninety_days_after_creation() {
        let log = UsageLog::new("u1", "20260727", UsageAction::Execution, 1_000);
        assert_eq!(log.ttl, 1_000 + 90 * 86_400);
    }
}
