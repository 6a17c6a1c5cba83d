use serde::{Deserialize, Serialize};

/// A subscription plan's quotas. `-1` denotes "unlimited", per §3.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub plan_id: String,
    pub name: String,
    pub max_hints_per_day: i64,
    pub max_executions_per_day: i64,
    pub max_problems: i64,
    pub can_view_all: bool,
    pub can_register: bool,
}

/// Sentinel quota value meaning "no limit".
pub const UNLIMITED: i64 = -1;

impl Plan {
    /// Quota for the given usage action, or `None` if the action carries no
    /// quota under this plan (treated the same as unlimited by callers).
    pub fn quota_for(&self, action: super::UsageAction) -> i64 {
        match action {
            super::UsageAction::Hint => self.max_hints_per_day,
            super::UsageAction::Execution => self.max_executions_per_day,
        }
    }

    /// `true` if `count` more requests are still allowed under `quota`
    /// (§4.2 step 4: "-1 means infinite; compare count to quota").
    pub fn allows(quota: i64, count: i64) -> bool {
        quota == UNLIMITED || count < quota
    }
}
