//! Logical findings: non-crashing defects found without a failing run.

use serde::{Deserialize, Serialize};

/// Severity of a finding. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Weight used when averaging confidence across findings.
    pub fn weight(&self) -> f32 {
        match self {
            Severity::Low => 0.5,
            Severity::Medium => 1.0,
            Severity::High => 1.5,
            Severity::Critical => 2.0,
        }
    }
}

/// What kind of logical defect a finding describes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FindingCategory {
    OffByOne,
    InfiniteLoop,
    UnreachableCode,
    MissingReturn,
    WrongComparison,
    IncorrectBaseCase,
    UninitializedVariable,
    AlwaysTrueFalse,
    WrongOperator,
    /// `if k in c: return c[other]`.
    ContainerKeyMisuse,
    MissingPercentageConversion,
    OutputMismatch,
    SuspiciousNoneOutput,
    DeadCode,
    BoundaryError,
    /// A `preorder`/`inorder`/`postorder` function visiting in another order.
    TraversalOrderMismatch,
    /// A function whose name promises an algorithm its body does not carry out.
    IncompleteImplementation,
}

impl FindingCategory {
    /// Position in the fixed repair priority order, lowest first.
    ///
    /// Categories outside the order return `None` and rank after every
    /// ordered category.
    pub fn priority_rank(&self) -> Option<u8> {
        match self {
            FindingCategory::WrongComparison => Some(0),
            FindingCategory::WrongOperator | FindingCategory::ContainerKeyMisuse => Some(1),
            FindingCategory::MissingPercentageConversion => Some(2),
            FindingCategory::OutputMismatch => Some(3),
            FindingCategory::OffByOne => Some(4),
            FindingCategory::MissingReturn => Some(5),
            FindingCategory::SuspiciousNoneOutput => Some(6),
            FindingCategory::InfiniteLoop
            | FindingCategory::UnreachableCode
            | FindingCategory::IncorrectBaseCase
            | FindingCategory::UninitializedVariable
            | FindingCategory::AlwaysTrueFalse
            | FindingCategory::DeadCode
            | FindingCategory::BoundaryError
            | FindingCategory::TraversalOrderMismatch
            | FindingCategory::IncompleteImplementation => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FindingCategory::OffByOne => "off_by_one",
            FindingCategory::InfiniteLoop => "infinite_loop",
            FindingCategory::UnreachableCode => "unreachable_code",
            FindingCategory::MissingReturn => "missing_return",
            FindingCategory::WrongComparison => "wrong_comparison",
            FindingCategory::IncorrectBaseCase => "incorrect_base_case",
            FindingCategory::UninitializedVariable => "uninitialized_variable",
            FindingCategory::AlwaysTrueFalse => "always_true_false",
            FindingCategory::WrongOperator => "wrong_operator",
            FindingCategory::ContainerKeyMisuse => "container_key_misuse",
            FindingCategory::MissingPercentageConversion => "missing_percentage_conversion",
            FindingCategory::OutputMismatch => "output_mismatch",
            FindingCategory::SuspiciousNoneOutput => "suspicious_none_output",
            FindingCategory::DeadCode => "dead_code",
            FindingCategory::BoundaryError => "boundary_error",
            FindingCategory::TraversalOrderMismatch => "traversal_order_mismatch",
            FindingCategory::IncompleteImplementation => "incomplete_implementation",
        }
    }
}

/// A single logical defect.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogicalFinding {
    pub category: FindingCategory,

    /// 1-indexed line, when the defect can be pinned to one.
    pub line: Option<u32>,

    pub severity: Severity,

    /// Confidence in [0, 1].
    pub confidence: f32,

    pub message: String,

    pub suggested_fix: Option<String>,
}

impl LogicalFinding {
    pub fn new(
        category: FindingCategory,
        line: Option<u32>,
        severity: Severity,
        confidence: f32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            line,
            severity,
            confidence: confidence.clamp(0.0, 1.0),
            message: message.into(),
            suggested_fix: None,
        }
    }

    /// Attach a suggested fix (builder pattern).
    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.suggested_fix = Some(fix.into());
        self
    }
}

/// Pick the finding to repair first: lowest priority rank, then earliest
/// in the list.
pub fn top_priority(findings: &[LogicalFinding]) -> Option<&LogicalFinding> {
    findings
        .iter()
        .enumerate()
        .min_by_key(|(idx, f)| (f.category.priority_rank().unwrap_or(u8::MAX), *idx))
        .map(|(_, f)| f)
}

/// Severity-weighted mean confidence; 0 for no findings.
pub fn weighted_confidence(findings: &[LogicalFinding]) -> f32 {
    let total_weight: f32 = findings.iter().map(|f| f.severity.weight()).sum();
    if total_weight == 0.0 {
        return 0.0;
    }
    findings
        .iter()
        .map(|f| f.confidence * f.severity.weight())
        .sum::<f32>()
        / total_weight
}

/// Sort by line (unpinned last) and drop repeated (category, line) pairs,
/// keeping the first occurrence.
pub fn normalize(findings: Vec<LogicalFinding>) -> Vec<LogicalFinding> {
    let mut seen = std::collections::HashSet::new();
    let mut out: Vec<LogicalFinding> = findings
        .into_iter()
        .filter(|f| seen.insert((f.category, f.line)))
        .collect();
    out.sort_by_key(|f| f.line.unwrap_or(u32::MAX));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(category: FindingCategory, line: u32) -> LogicalFinding {
        LogicalFinding::new(category, Some(line), Severity::Medium, 0.8, "x")
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_priority_order_is_fixed() {
        let findings = vec![
            finding(FindingCategory::SuspiciousNoneOutput, 1),
            finding(FindingCategory::OffByOne, 2),
            finding(FindingCategory::MissingReturn, 3),
            finding(FindingCategory::WrongComparison, 9),
        ];
        assert_eq!(
            top_priority(&findings).unwrap().category,
            FindingCategory::WrongComparison
        );

        let findings = vec![
            finding(FindingCategory::MissingReturn, 1),
            finding(FindingCategory::OffByOne, 5),
        ];
        assert_eq!(top_priority(&findings).unwrap().category, FindingCategory::OffByOne);
    }

    #[test]
    fn test_unranked_categories_fall_back_to_first() {
        let findings = vec![
            finding(FindingCategory::UnreachableCode, 4),
            finding(FindingCategory::InfiniteLoop, 2),
        ];
        assert_eq!(
            top_priority(&findings).unwrap().category,
            FindingCategory::UnreachableCode
        );
        assert!(top_priority(&[]).is_none());
    }

    #[test]
    fn test_container_key_misuse_ranks_with_wrong_operator() {
        let findings = vec![
            finding(FindingCategory::MissingPercentageConversion, 1),
            finding(FindingCategory::ContainerKeyMisuse, 7),
        ];
        assert_eq!(
            top_priority(&findings).unwrap().category,
            FindingCategory::ContainerKeyMisuse
        );
    }

    #[test]
    fn test_weighted_confidence() {
        let findings = vec![
            LogicalFinding::new(FindingCategory::OffByOne, Some(1), Severity::Low, 0.5, ""),
            LogicalFinding::new(FindingCategory::InfiniteLoop, Some(2), Severity::Critical, 1.0, ""),
        ];
        // (0.5 * 0.5 + 1.0 * 2.0) / 2.5
        assert!((weighted_confidence(&findings) - 0.9).abs() < 1e-6);
        assert_eq!(weighted_confidence(&[]), 0.0);
    }

    #[test]
    fn test_normalize_dedupes_and_sorts() {
        let findings = vec![
            finding(FindingCategory::OffByOne, 5),
            finding(FindingCategory::DeadCode, 2),
            finding(FindingCategory::OffByOne, 5),
        ];
        let out = normalize(findings);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].line, Some(2));
        assert_eq!(out[1].category, FindingCategory::OffByOne);
    }

    #[test]
    fn test_confidence_is_clamped() {
        let f = LogicalFinding::new(FindingCategory::DeadCode, None, Severity::Low, 1.7, "");
        assert_eq!(f.confidence, 1.0);
    }
}
