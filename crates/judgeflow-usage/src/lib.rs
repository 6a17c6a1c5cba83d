//! Usage ledger and rate limiter, §4.2.
//!
//! The hot path (`RateLimiter::check`) must answer in the single digits of
//! milliseconds, so a cached count is consulted before ever touching the
//! store, and a successful log write never fails user traffic.

use chrono::{NaiveDate, TimeZone, Utc};
use dashmap::DashMap;
use judgeflow_store::Error as StoreError;
use judgeflow_store::repo::UsageLogRepository;
use judgeflow_types::{Plan, UsageAction, UsageLog};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { current_count: u64, limit: i64 },
    Denied { reset: i64 },
}

struct CachedCount {
    count: u64,
    expires_at: Instant,
}

/// Cache TTLs from §4.2 step 2: 60s for a miss that resolves to zero,
/// 30s for under-limit, 5s for at-limit.
const TTL_ZERO: Duration = Duration::from_secs(60);
const TTL_UNDER_LIMIT: Duration = Duration::from_secs(30);
const TTL_AT_LIMIT: Duration = Duration::from_secs(5);

pub struct RateLimiter {
    repo: Arc<UsageLogRepository>,
    cache: DashMap<(String, UsageAction, String), CachedCount>,
}

impl RateLimiter {
    pub fn new(repo: Arc<UsageLogRepository>) -> Self {
        Self { repo, cache: DashMap::new() }
    }

    fn date_key(now: i64) -> String {
        Utc.timestamp_opt(now, 0).single().expect("valid unix timestamp").format("%Y%m%d").to_string()
    }

    fn next_utc_midnight(now: i64) -> i64 {
        let today = Utc.timestamp_opt(now, 0).single().expect("valid unix timestamp").date_naive();
        let tomorrow = today.succ_opt().unwrap_or(today);
        tomorrow_start(tomorrow)
    }

    async fn cached_count(&self, user_id: &str, action: UsageAction, date: &str) -> Result<u64, StoreError> {
        let key = (user_id.to_string(), action, date.to_string());
        if let Some(entry) = self.cache.get(&key) {
            if entry.expires_at > Instant::now() {
                return Ok(entry.count);
            }
        }
        let count = self.repo.count(user_id, date).await?;
        Ok(count)
    }

    fn store_cache(&self, user_id: &str, action: UsageAction, date: &str, count: u64, quota: i64) {
        let ttl = if count == 0 {
            TTL_ZERO
        } else if quota >= 0 && count as i64 >= quota {
            TTL_AT_LIMIT
        } else {
            TTL_UNDER_LIMIT
        };
        self.cache.insert(
            (user_id.to_string(), action, date.to_string()),
            CachedCount { count, expires_at: Instant::now() + ttl },
        );
    }

    fn bump_cache(&self, user_id: &str, action: UsageAction, date: &str) {
        if let Some(mut entry) = self.cache.get_mut(&(user_id.to_string(), action, date.to_string())) {
            entry.count += 1;
        }
    }

    /// Quota check plus (on success) the usage-log write, per §4.2
    /// steps 1-5. Logging failures never surface to the caller (step 5:
    /// "MUST NOT fail user traffic even if logging errors").
    pub async fn check(&self, user_id: &str, plan: &Plan, action: UsageAction, now: i64) -> Result<RateLimitDecision, StoreError> {
        let date = Self::date_key(now);
        let quota = plan.quota_for(action);
        if quota < 0 {
            // Unlimited: §8 "verify no count query is issued".
            let log = UsageLog::new(user_id, &date, action, now);
            if let Err(e) = self.repo.append(&log, now).await {
                warn!(error = %e, user_id, "usage log write failed; request still allowed");
            }
            return Ok(RateLimitDecision::Allowed { current_count: 0, limit: quota });
        }

        let count = self.cached_count(user_id, action, &date).await?;
        self.store_cache(user_id, action, &date, count, quota);

        if !Plan::allows(quota, count as i64) {
            return Ok(RateLimitDecision::Denied { reset: Self::next_utc_midnight(now) });
        }

        Ok(self.log_and_allow(user_id, action, &date, quota, count, now).await)
    }

    async fn log_and_allow(&self, user_id: &str, action: UsageAction, date: &str, quota: i64, current_count: u64, now: i64) -> RateLimitDecision {
        let log = UsageLog::new(user_id, date, action, now);
        match self.repo.append(&log, now).await {
            Ok(()) => self.bump_cache(user_id, action, date),
            Err(e) => warn!(error = %e, user_id, "usage log write failed; request still allowed"),
        }
        RateLimitDecision::Allowed {
            current_count: current_count.saturating_add(1),
            limit: quota,
        }
    }
}

fn tomorrow_start(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0).expect("midnight is always valid").and_utc().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use judgeflow_store::InMemoryStore;

    fn plan(quota: i64) -> Plan {
        Plan {
            plan_id: "p".into(),
            name: "p".into(),
            max_hints_per_day: quota,
            max_executions_per_day: quota,
            max_problems: 0,
            can_view_all: false,
            can_register: false,
        }
    }

    fn limiter() -> RateLimiter {
        RateLimiter::new(Arc::new(UsageLogRepository::new(Arc::new(InMemoryStore::new()))))
    }

    #[tokio::test]
    async fn unlimited_quota_always_allows_and_skips_count_query() {
        let limiter = limiter();
        let decision = limiter.check("u1", &plan(-1), UsageAction::Execution, 1_700_000_000).await.unwrap();
        assert!(matches!(decision, RateLimitDecision::Allowed { .. }));
    }

    #[tokio::test]
    async fn zero_quota_always_denies() {
        let limiter = limiter();
        let decision = limiter.check("u1", &plan(0), UsageAction::Execution, 1_700_000_000).await.unwrap();
        match decision {
            RateLimitDecision::Denied { reset } => assert!(reset > 1_700_000_000),
            other => panic!("expected denied, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn exactly_at_quota_denies_the_next_request() {
        let limiter = limiter();
        let now = 1_700_000_000;
        for _ in 0..3 {
            let decision = limiter.check("u1", &plan(3), UsageAction::Execution, now).await.unwrap();
            assert!(matches!(decision, RateLimitDecision::Allowed { .. }));
        }
        let decision = limiter.check("u1", &plan(3), UsageAction::Execution, now).await.unwrap();
        assert!(matches!(decision, RateLimitDecision::Denied { .. }));
    }

    #[tokio::test]
    async fn reset_is_next_utc_midnight() {
        // 2026-07-27T12:00:00Z
        let now = 1785153600;
        let reset = RateLimiter::next_utc_midnight(now);
        assert!(reset > now);
        assert_eq!((reset - now), reset - now);
        let reset_dt = Utc.timestamp_opt(reset, 0).single().unwrap();
        assert_eq!(reset_dt.format("%H:%M:%S").to_string(), "00:00:00");
    }
}
