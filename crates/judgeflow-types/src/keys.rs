//! Key builders for every access pattern named in §3 and §4.1. Kept as
//! free functions on a zero-sized `Keys` namespace rather than methods on
//! each entity, so the key layout is auditable in one place (the repository
//! layer in `judgeflow-store` is the only other place that should construct
//! keys by hand).

/// Zero-pads a timestamp so that lexicographic sort-key ordering matches
/// numeric ordering up to ~3170 AD (19-digit nanosecond timestamps).
fn zero_pad(ts: i64) -> String {
    format!("{ts:019}")
}

/// Namespace for PK/SK/GSI key construction.
pub struct Keys;

impl Keys {
    pub fn user_pk(user_id: &str) -> String {
        format!("USR#{user_id}")
    }

    pub fn meta_sk() -> &'static str {
        "META"
    }

    pub fn user_by_email_gsi1pk(email: &str) -> String {
        format!("EMAIL#{email}")
    }

    pub fn user_by_oauth_gsi2pk(external_oauth_id: &str) -> String {
        format!("OAUTH#{external_oauth_id}")
    }

    pub fn plan_pk(plan_id: &str) -> String {
        format!("PLAN#{plan_id}")
    }

    pub fn problem_pk(platform: &str, problem_id: &str) -> String {
        format!("PROB#{platform}#{problem_id}")
    }

    pub fn problem_status_gsi3pk(completed: bool) -> &'static str {
        if completed {
            "PROB#COMPLETED"
        } else {
            "PROB#DRAFT"
        }
    }

    pub fn sgjob_pk(job_id: &str) -> String {
        format!("SGJOB#{job_id}")
    }

    pub fn sgjob_status_gsi1pk(status: &str) -> String {
        format!("SGJOB#STATUS#{status}")
    }

    pub fn pejob_pk(job_id: &str) -> String {
        format!("PEJOB#{job_id}")
    }

    pub fn pejob_status_gsi1pk(status: &str) -> String {
        format!("PEJOB#STATUS#{status}")
    }

    pub fn job_progress_pk(kind: &str, job_id: &str) -> String {
        format!("JOB#{kind}#{job_id}")
    }

    pub fn job_progress_sk(timestamp: i64) -> String {
        format!("PROG#{}", zero_pad(timestamp))
    }

    pub fn history_pk(email: &str, platform: &str, problem_number: &str) -> String {
        format!("EMAIL#{email}#SHIST#{platform}#{problem_number}")
    }

    pub fn history_sk(timestamp_ms: i64) -> String {
        format!("HIST#{}", zero_pad(timestamp_ms))
    }

    pub fn public_history_gsi1pk() -> &'static str {
        "PUBLIC#HIST"
    }

    pub fn usage_pk(user_id: &str, date: &str) -> String {
        format!("USR#{user_id}#ULOG#{date}")
    }

    pub fn usage_sk(unix_ts: i64, action: &str) -> String {
        format!("ULOG#{}#{action}", zero_pad(unix_ts))
    }

    /// DynamoDB-style `COUNT`-only range-key prefix for a daily usage
    /// partition, used by `begins_with`/range queries.
    pub fn usage_sk_prefix() -> &'static str {
        "ULOG#"
    }

    /// Object-store key for a problem's compressed test-case manifest
    /// (§6).
    pub fn testcase_object_key(platform: &str, problem_id: &str) -> String {
        format!("testcases/{platform}/{problem_id}/testcases.json.gz")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn problem_status_key_is_sparse_by_construction() {
        assert_eq!(Keys::problem_status_gsi3pk(true), "PROB#COMPLETED");
        assert_eq!(Keys::problem_status_gsi3pk(false), "PROB#DRAFT");
    }

    #[test]
    fn history_key_embeds_email_platform_and_problem() {
        assert_eq!(
            Keys::history_pk("a@b.com", "baekjoon", "1000"),
            "EMAIL#a@b.com#SHIST#baekjoon#1000"
        );
    }

    #[test]
    fn testcase_object_key_matches_wire_layout() {
        assert_eq!(
            Keys::testcase_object_key("baekjoon", "1000"),
            "testcases/baekjoon/1000/testcases.json.gz"
        );
    }

    proptest::proptest! {
        #[test]
        fn usage_sk_is_ordered_by_timestamp(a in 0i64..1_000_000, b in 0i64..1_000_000) {
            let sa = Keys::usage_sk(a, "hint");
            let sb = Keys::usage_sk(b, "hint");
            if a < b {
                proptest::prop_assert!(sa < sb);
            }
        }
    }
}
