//! Evaluation test cases and reports.

use serde::{Deserialize, Serialize};

/// A single evaluation test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    /// Message sent to the agent.
    pub input: String,
    /// Substring expected (case-insensitively) in the agent's reply.
    pub expected_output: String,
}

impl TestCase {
    /// Create a new test case.
    pub fn new(input: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected_output: expected_output.into(),
        }
    }
}

/// Outcome of one evaluation case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseResult {
    /// 1-based case number, in submission order.
    pub case: usize,
    /// The input that was sent.
    pub input: String,
    /// The expected substring.
    pub expected: String,
    /// The actual reply, or the error text if execution failed.
    pub actual: String,
    /// Whether the expected substring matched.
    pub passed: bool,
}

/// Aggregated result of an evaluation batch.
///
/// Reports are ephemeral: computed fresh per call, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Name of the agent that was evaluated.
    pub agent_name: String,
    /// Total number of cases.
    pub total: usize,
    /// Number of cases that passed.
    pub passed: usize,
    /// Per-case results, in submission order.
    pub results: Vec<CaseResult>,
}

impl EvaluationReport {
    /// Build a report from per-case results.
    pub fn from_results(agent_name: impl Into<String>, results: Vec<CaseResult>) -> Self {
        let passed = results.iter().filter(|r| r.passed).count();
        Self {
            agent_name: agent_name.into(),
            total: results.len(),
            passed,
            results,
        }
    }

    /// Pass rate in [0.0, 1.0], or `None` for an empty batch.
    pub fn pass_rate(&self) -> Option<f64> {
        if self.total == 0 {
            None
        } else {
            Some(self.passed as f64 / self.total as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(n: usize, passed: bool) -> CaseResult {
        CaseResult {
            case: n,
            input: format!("input {n}"),
            expected: "ok".to_string(),
            actual: if passed { "ok" } else { "nope" }.to_string(),
            passed,
        }
    }

    #[test]
    fn test_report_counts() {
        let report = EvaluationReport::from_results(
            "faq",
            vec![case(1, true), case(2, false), case(3, true)],
        );
        assert_eq!(report.total, 3);
        assert_eq!(report.passed, 2);
        assert!((report.pass_rate().unwrap() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_report_has_no_rate() {
        let report = EvaluationReport::from_results("faq", vec![]);
        assert_eq!(report.total, 0);
        assert_eq!(report.passed, 0);
        assert!(report.pass_rate().is_none());
    }
}
