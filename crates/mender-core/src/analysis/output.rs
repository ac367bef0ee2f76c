//! Inspection of a successful run's stdout.

use crate::domain::{FindingCategory, LogicalFinding, Severity};

/// Findings from printed output: values that came out as `None`, and
/// self-checking lines of the form `(expect N): M` with N != M.
pub fn inspect_output(stdout: &str) -> Vec<LogicalFinding> {
    let none_re = static_regex!(r"(?i)(\w+)(?:\s+is|\s*[=:])\s+None\b");
    let expect_re = static_regex!(r"\(expect\s+(-?\d+)\)[:\s]+(-?\d+)");

    let mut findings = Vec::new();
    if let Some(m) = none_re.find(stdout) {
        findings.push(
            LogicalFinding::new(
                FindingCategory::SuspiciousNoneOutput,
                None,
                Severity::Medium,
                0.7,
                format!("Output shows '{}': a function probably returns nothing", m.as_str()),
            )
            .with_fix("Return the computed value from the function"),
        );
    }

    for caps in expect_re.captures_iter(stdout) {
        let (Ok(expected), Ok(actual)) = (caps[1].parse::<i64>(), caps[2].parse::<i64>()) else {
            continue;
        };
        if expected == actual {
            continue;
        }
        findings.push(LogicalFinding::new(
            FindingCategory::OutputMismatch,
            None,
            Severity::Medium,
            0.8,
            format!("Expected {expected} but the program printed {actual}"),
        ));
        break;
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_output() {
        let findings = inspect_output("Sum up to 10 is None\n");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, FindingCategory::SuspiciousNoneOutput);
        assert!(findings[0].message.contains("10 is None"));
        assert_eq!(inspect_output("Sum: None\n").len(), 1);
        assert!(inspect_output("Nonesuch value: 4\n").is_empty());
    }

    #[test]
    fn test_expectation_mismatch() {
        let findings = inspect_output("Sum of first 10 (expect 55): 45\n");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].category, FindingCategory::OutputMismatch);
        assert!(inspect_output("Sum of first 10 (expect 55): 55\n").is_empty());
    }

    #[test]
    fn test_plain_output_is_clean() {
        assert!(inspect_output("5\nhello\n").is_empty());
        assert!(inspect_output("").is_empty());
    }
}
