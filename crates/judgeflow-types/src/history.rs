use serde::{Deserialize, Serialize};

/// Per-test-case outcome, as stored (compressed, per §3) inside a
/// `SearchHistory` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCaseOutcome {
    pub test_case_id: String,
    pub output: String,
    pub passed: bool,
    pub error: Option<String>,
    pub status: String,
}

/// `SearchHistory` entity payload (§3). Immutable except for `hints`,
/// which is set at most once by `GenerateHints`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHistory {
    pub email: String,
    pub platform: String,
    pub problem_number: String,
    /// Millisecond sort key / row id (invariant 6: monotonic per
    /// writer, microsecond clock with collision retry).
    pub history_id: i64,
    pub title: String,
    pub code: String,
    pub language: String,
    pub public: bool,
    pub passed: u32,
    pub failed: u32,
    pub total: u32,
    pub outcomes: Vec<TestCaseOutcome>,
    pub hints: Option<Vec<String>>,
    pub crt: i64,
}

impl SearchHistory {
    /// §8: "passed + failed = total" for every row.
    pub fn counts_are_consistent(&self) -> bool {
        self.passed + self.failed == self.total
    }

    pub fn result_summary(&self) -> &'static str {
        if self.failed == 0 && self.total > 0 {
            "Passed"
        } else if self.total == 0 {
            "No test cases"
        } else {
            "Failed"
        }
    }

    pub fn needs_hints(&self) -> bool {
        self.failed > 0 && self.hints.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(passed: u32, failed: u32, total: u32) -> SearchHistory {
        SearchHistory {
            email: "a@b.com".into(),
            platform: "baekjoon".into(),
            problem_number: "1000".into(),
            history_id: 1,
            title: "A+B".into(),
            code: "print(1)".into(),
            language: "python".into(),
            public: false,
            passed,
            failed,
            total,
            outcomes: vec![],
            hints: None,
            crt: 0,
        }
    }

    #[test]
    fn all_pass_reports_passed_summary() {
        let h = history(2, 0, 2);
        assert!(h.counts_are_consistent());
        assert_eq!(h.result_summary(), "Passed");
        assert!(!h.needs_hints());
    }

    #[test]
    fn partial_failure_needs_hints_until_set() {
        let mut h = history(1, 1, 2);
        assert!(h.needs_hints());
        h.hints = Some(vec!["try again".into()]);
        assert!(!h.needs_hints());
    }
}
