//! Shared retry/backoff policy.
//!
//! §4.1, §4.5, §4.8, and §7 each describe a retry policy with the same
//! shape (attempts, base delay, exponential backoff, cap, jitter) but
//! different numbers. Rather than re-deriving the math three times, this
//! crate exposes one `Backoff` config plus constructors for each named
//! policy, following the predefined-policy idiom in `shipper-retry`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Exponential backoff with full jitter, shared by the store's `Throttled`
/// retry (§4.1), the worker pool's per-task retry (§4.5), the
/// broker's redelivery policy (§4.4), and the LLM gateway's retry
/// (§4.8).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backoff {
    pub max_attempts: u32,
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
    /// Jitter factor in `[0.0, 1.0]`; `0.0` disables jitter, `1.0` is full
    /// jitter (delay uniformly sampled from `[0, capped_delay]`).
    pub jitter: f64,
}

impl Backoff {
    /// Store capacity errors: "retry with exponential backoff, jitter, cap
    /// 30s, max 5 attempts" (§4.1).
    pub fn store_throttled() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(30),
            jitter: 0.5,
        }
    }

    /// Worker task retry default: "3 retries, 60s base, exponential with
    /// jitter, cap 30 min" (§4.5).
    pub fn worker_default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(60),
            max_delay: Duration::from_secs(30 * 60),
            jitter: 0.5,
        }
    }

    /// LLM gateway retry: "3 attempts with exponential backoff (base 10s,
    /// cap 2 min)" (§4.8).
    pub fn llm_gateway() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(2 * 60),
            jitter: 0.3,
        }
    }

    /// Broker max redeliveries before dead-lettering: "Max broker retries =
    /// 5; the 6th delivery is routed to a dead-letter store" (§4.4).
    pub fn broker_redelivery() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            jitter: 0.2,
        }
    }

    /// Webpage fetcher: "30s timeout, 3 retries" (§4.9).
    pub fn webpage_fetch() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(20),
            jitter: 0.3,
        }
    }

    /// `true` while `attempt` (1-indexed, the attempt that just failed) is
    /// still within budget for another try.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Exponential delay before the given attempt (1-indexed), capped and
    /// jittered.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let pow = attempt.saturating_sub(1).min(20);
        let exp = self.base_delay.saturating_mul(2_u32.saturating_pow(pow));
        let capped = exp.min(self.max_delay);
        if self.jitter <= 0.0 {
            capped
        } else {
            jittered(capped, self.jitter)
        }
    }
}

fn jittered(delay: Duration, jitter: f64) -> Duration {
    use rand::Rng;
    let jitter = jitter.clamp(0.0, 1.0);
    let mut rng = rand::thread_rng();
    let factor = 1.0 - jitter + rng.gen::<f64>() * jitter;
    let millis = (delay.as_millis() as f64 * factor).round().max(0.0) as u64;
    Duration::from_millis(millis)
}

/// Run an async fallible operation under a `Backoff` policy, sleeping
/// between attempts. `classify` decides whether a given error is worth
/// retrying at all (permanent errors short-circuit immediately, matching
/// §7's "only terminal errors surface as Job FAILED").
pub async fn retry_async<T, E, F, Fut>(backoff: &Backoff, mut classify: impl FnMut(&E) -> bool, mut operation: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
{
    let mut attempt = 1;
    loop {
        match operation(attempt).await {
            Ok(v) => return Ok(v),
            Err(e) => {
                if !classify(&e) || !backoff.should_retry(attempt) {
                    return Err(e);
                }
                tokio::time::sleep(backoff.delay_for(attempt)).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_exponentially_before_the_cap() {
        let b = Backoff {
            max_attempts: 10,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            jitter: 0.0,
        };
        assert_eq!(b.delay_for(1), Duration::from_secs(1));
        assert_eq!(b.delay_for(2), Duration::from_secs(2));
        assert_eq!(b.delay_for(3), Duration::from_secs(4));
    }

    #[test]
    fn delay_never_exceeds_the_cap() {
        let b = Backoff {
            max_attempts: 20,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            jitter: 0.0,
        };
        assert_eq!(b.delay_for(10), Duration::from_secs(10));
    }

    #[test]
    fn should_retry_respects_max_attempts() {
        let b = Backoff::worker_default();
        assert!(b.should_retry(1));
        assert!(b.should_retry(2));
        assert!(!b.should_retry(3));
    }

    #[tokio::test]
    async fn retry_async_stops_on_permanent_error() {
        let b = Backoff {
            max_attempts: 5,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            jitter: 0.0,
        };
        let mut calls = 0;
        let result: Result<(), &str> = retry_async(&b, |_e| false, |_attempt| {
            calls += 1;
            async { Err("permanent") }
        })
        .await;
        assert_eq!(result, Err("permanent"));
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn retry_async_succeeds_after_transient_failures() {
        let b = Backoff {
            max_attempts: 5,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            jitter: 0.0,
        };
        let mut calls = 0;
        let result: Result<&str, &str> = retry_async(&b, |_e| true, |attempt| {
            calls += 1;
            async move {
                if attempt < 3 {
                    Err("transient")
                } else {
                    Ok("ok")
                }
            }
        })
        .await;
        assert_eq!(result, Ok("ok"));
        assert_eq!(calls, 3);
    }

    proptest::proptest! {
        #[test]
        fn jittered_delay_never_exceeds_capped_delay(millis in 1u64..100_000) {
            let delay = Duration::from_millis(millis);
            let out = jittered(delay, 1.0);
            proptest::prop_assert!(out <= delay);
        }
    }
}
