//! Verification checks and their aggregate result.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status of a check, or of a whole verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Passed,
    Failed,
    Skipped,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Passed => "passed",
            VerificationStatus::Failed => "failed",
            VerificationStatus::Skipped => "skipped",
        }
    }
}

/// A single verification check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationCheck {
    pub name: String,
    pub expected: Value,
    pub actual: Value,
    pub status: VerificationStatus,
    pub message: String,
}

impl VerificationCheck {
    pub fn new(
        name: impl Into<String>,
        expected: Value,
        actual: Value,
        status: VerificationStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            expected,
            actual,
            status,
            message: message.into(),
        }
    }

    pub fn passed(&self) -> bool {
        self.status == VerificationStatus::Passed
    }
}

/// Aggregate verification outcome for one execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub plan_id: String,
    pub checks: Vec<VerificationCheck>,
    pub overall_status: VerificationStatus,
    /// Exactly 1.0 when every check passed, 0.0 otherwise
    pub confidence: f64,
    pub reasoning: String,
}

impl VerificationResult {
    /// Aggregate checks. Passed iff every check passed; an empty list fails.
    pub fn from_checks(plan_id: impl Into<String>, checks: Vec<VerificationCheck>, operation: &str) -> Self {
        let all_passed = !checks.is_empty() && checks.iter().all(|c| c.passed());
        let (overall_status, confidence, reasoning) = if all_passed {
            (VerificationStatus::Passed, 1.0, format!("All {} checks passed", operation))
        } else {
            (VerificationStatus::Failed, 0.0, "One or more checks failed".to_string())
        };

        Self {
            plan_id: plan_id.into(),
            checks,
            overall_status,
            confidence,
            reasoning,
        }
    }

    pub fn passed(&self) -> bool {
        self.overall_status == VerificationStatus::Passed
    }

    /// First failed check, if any.
    pub fn first_failure(&self) -> Option<&VerificationCheck> {
        self.checks.iter().find(|c| !c.passed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn check(status: VerificationStatus) -> VerificationCheck {
        VerificationCheck::new("addition_correctness", json!(3), json!(3), status, "msg")
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(VerificationStatus::Passed.as_str(), "passed");
        assert_eq!(VerificationStatus::Failed.as_str(), "failed");
        assert_eq!(VerificationStatus::Skipped.as_str(), "skipped");
        assert_eq!(serde_json::to_value(VerificationStatus::Skipped).unwrap(), json!("skipped"));
    }

    #[test]
    fn test_all_passed_gives_full_confidence() {
        let result = VerificationResult::from_checks(
            "p",
            vec![check(VerificationStatus::Passed), check(VerificationStatus::Passed)],
            "add",
        );
        assert!(result.passed());
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.reasoning, "All add checks passed");
        assert!(result.first_failure().is_none());
    }

    #[test]
    fn test_any_failure_gives_zero_confidence() {
        let result = VerificationResult::from_checks(
            "p",
            vec![check(VerificationStatus::Passed), check(VerificationStatus::Failed)],
            "add",
        );
        assert!(!result.passed());
        assert_eq!(result.overall_status, VerificationStatus::Failed);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.reasoning, "One or more checks failed");
    }

    #[test]
    fn test_skipped_check_is_not_passed() {
        let result = VerificationResult::from_checks("p", vec![check(VerificationStatus::Skipped)], "add");
        assert!(!result.passed());
    }

    #[test]
    fn test_no_checks_fails() {
        let result = VerificationResult::from_checks("p", vec![], "add");
        assert!(!result.passed());
    }
}
