//! Validation verdict types.
//!
//! The checks themselves live in `vigil_validator`; these types are shared so
//! that outcomes and cache entries can carry a verdict.

use serde::{Deserialize, Serialize};

/// Severity of a validation issue.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Severity {
    /// Blocks acceptance.
    Critical,
    /// Quality concern, still acceptable.
    Major,
    /// Cosmetic.
    Minor,
}

impl Severity {
    /// Confidence deducted for one issue of this severity.
    pub fn deduction(self) -> f32 {
        match self {
            Severity::Critical => 0.5,
            Severity::Major => 0.2,
            Severity::Minor => 0.05,
        }
    }
}

/// What part of the output an issue concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IssueCategory {
    /// Required modality absent.
    MissingContent,
    /// Image dimensions or uniformity.
    ImageQuality,
    /// Compression blocks, colour casts, edge anomalies.
    ImageArtifact,
    /// Length, punctuation, repetition, coherence.
    TextQuality,
    /// Text that reads like an error message.
    TextError,
    /// Contradictory statements.
    TextContradiction,
    /// Text and image do not appear related.
    CrossModalConsistency,
}

/// A single finding from the output validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Severity
    severity: Severity,
    /// Category
    category: IssueCategory,
    /// Human-readable message
    message: String,
}

impl ValidationIssue {
    /// Create an issue.
    pub fn new(severity: Severity, category: IssueCategory, message: impl Into<String>) -> Self {
        Self {
            severity,
            category,
            message: message.into(),
        }
    }

    /// Severity of the issue.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Category of the issue.
    pub fn category(&self) -> IssueCategory {
        self.category
    }

    /// Human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Create a critical issue.
    pub fn critical(category: IssueCategory, message: impl Into<String>) -> Self {
        Self::new(Severity::Critical, category, message)
    }

    /// Create a major issue.
    pub fn major(category: IssueCategory, message: impl Into<String>) -> Self {
        Self::new(Severity::Major, category, message)
    }

    /// Create a minor issue.
    pub fn minor(category: IssueCategory, message: impl Into<String>) -> Self {
        Self::new(Severity::Minor, category, message)
    }
}

/// Aggregated verdict for one candidate output.
///
/// `passed`, `confidence` and `should_retry` are derived purely from the
/// issue list: `passed` is false iff a critical issue is present, confidence
/// starts at 1.0 and loses 0.5/0.2/0.05 per critical/major/minor issue
/// (floored at 0), and a retry is recommended iff validation failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// True iff no critical issue is present
    passed: bool,
    /// Confidence in [0, 1]
    confidence: f32,
    /// All issues found
    issues: Vec<ValidationIssue>,
    /// True iff the output failed with at least one critical issue
    should_retry: bool,
}

impl ValidationResult {
    /// Derive a verdict from a list of issues.
    pub fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        let has_critical = issues.iter().any(|i| i.severity == Severity::Critical);
        let deductions: f32 = issues.iter().map(|i| i.severity.deduction()).sum();
        let confidence = (1.0 - deductions).max(0.0);
        let passed = !has_critical;
        Self {
            passed,
            confidence,
            issues,
            should_retry: !passed && has_critical,
        }
    }

    /// True iff no critical issue is present.
    pub fn passed(&self) -> bool {
        self.passed
    }

    /// Confidence score in [0, 1].
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// All issues found.
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    /// True iff a fresh generation attempt is recommended.
    pub fn should_retry(&self) -> bool {
        self.should_retry
    }

    /// A verdict with no issues.
    pub fn clean() -> Self {
        Self::from_issues(Vec::new())
    }

    /// Number of issues with the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    /// True if any issue has the given category.
    pub fn has_category(&self, category: IssueCategory) -> bool {
        self.issues.iter().any(|i| i.category == category)
    }

    /// One-line description of the most severe issues.
    pub fn summary(&self) -> String {
        let worst = self.issues.iter().map(|i| i.severity).min();
        match worst {
            None => "no issues".to_string(),
            Some(severity) => self
                .issues
                .iter()
                .filter(|i| i.severity == severity)
                .map(|i| i.message.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}
