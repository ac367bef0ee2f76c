//! Test-case driven diagnosis.
//!
//! Sources may carry annotated cases in comments:
//!
//! ```text
//! # TEST: adds one
//! # INPUT: 5
//! # EXPECTED: 6
//! ```
//!
//! Each case runs the source under a harness that calls the entry function
//! (`main`, `solution` or `solve`) and prints the JSON result.
//! Failing cases become [`LogicalFinding`]s.

use mender_sandbox::{Executor, Language, ResourceLimits};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::domain::{FindingCategory, LogicalFinding, Result, Severity};

const RESULT_MARKER: &str = "__RESULT__:";
const ERROR_MARKER: &str = "__ERROR__:";

/// Numeric comparison tolerance.
const TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestCase {
    pub name: String,
    pub input: Value,
    pub expected: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseResult {
    pub case: TestCase,
    /// `None` when the harness printed no result.
    pub actual: Option<Value>,
    pub error: Option<String>,
    pub passed: bool,
}

/// Whether annotated cases can run for `language`.
pub fn supports(language: Language) -> bool {
    matches!(language, Language::Python | Language::JavaScript)
}

/// Collect annotated cases. A case needs all three of `TEST`, `INPUT` and
/// `EXPECTED`; values that are not valid JSON are kept as strings.
pub fn parse_test_cases(source: &str) -> Vec<TestCase> {
    #[derive(Default)]
    struct Pending {
        name: Option<String>,
        input: Option<Value>,
        expected: Option<Value>,
    }

    impl Pending {
        fn finish(self) -> Option<TestCase> {
            Some(TestCase {
                name: self.name?,
                input: self.input?,
                expected: self.expected?,
            })
        }
    }

    fn annotation<'a>(line: &'a str, key: &str) -> Option<&'a str> {
        let body = line
            .strip_prefix('#')
            .or_else(|| line.strip_prefix("//"))?
            .trim_start();
        body.strip_prefix(key)?.strip_prefix(':').map(str::trim)
    }

    fn json_or_text(raw: &str) -> Value {
        serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
    }

    let mut cases = Vec::new();
    let mut pending = Pending::default();
    for line in source.lines().map(str::trim) {
        if let Some(name) = annotation(line, "TEST") {
            cases.extend(std::mem::take(&mut pending).finish());
            pending.name = Some(name.to_string());
        } else if let Some(raw) = annotation(line, "INPUT") {
            pending.input = Some(json_or_text(raw));
        } else if let Some(raw) = annotation(line, "EXPECTED") {
            pending.expected = Some(json_or_text(raw));
        }
    }
    cases.extend(pending.finish());
    cases
}

/// A program running `source` under the harness for `case`, or `None` when
/// the language has no harness.
pub fn harness(language: Language, source: &str, case: &TestCase) -> Option<String> {
    let input = serde_json::to_string(&case.input).ok()?;
    match language {
        Language::Python => {
            // Both the source and the JSON input travel as string literals;
            // JSON string escapes are valid Python escapes. The source is
            // compiled verbatim so `from __future__` imports stay first.
            let literal = serde_json::to_string(&input).ok()?;
            let program = serde_json::to_string(source).ok()?;
            Some(format!(
                r#"import inspect as __mender_inspect
import json as __mender_json

__mender_ns = {{"__name__": "__mender_harness__", "__builtins__": __builtins__}}
exec(compile({program}, "main.py", "exec"), __mender_ns)


def __mender_call(fn, data):
    try:
        params = list(__mender_inspect.signature(fn).parameters.values())
    except (TypeError, ValueError):
        params = []
    if not params:
        return fn()
    if isinstance(data, list) and len(data) == len(params) and len(data) != 1:
        return fn(*data)
    if isinstance(data, dict) and data and all(p.name in data for p in params):
        return fn(**data)
    return fn(data)


try:
    __mender_entry = next(
        (__mender_ns[n] for n in ("main", "solution", "solve") if callable(__mender_ns.get(n))),
        None,
    )
    __mender_result = None
    if __mender_entry is not None:
        __mender_result = __mender_call(__mender_entry, __mender_json.loads({literal}))
    print("{RESULT_MARKER}", __mender_json.dumps(__mender_result))
except Exception as __mender_error:
    print("{ERROR_MARKER}", __mender_error)
"#
            ))
        }
        Language::JavaScript => Some(format!(
            r#"{source}

;(() => {{
  const input = {input};
  const entry =
    typeof main === 'function' ? main :
    typeof solution === 'function' ? solution :
    typeof solve === 'function' ? solve : null;
  try {{
    let result = null;
    if (entry) {{
      if (entry.length === 0) result = entry();
      else if (Array.isArray(input) && input.length === entry.length && input.length !== 1) result = entry(...input);
      else result = entry(input);
    }}
    console.log('{RESULT_MARKER} ' + JSON.stringify(result === undefined ? null : result));
  }} catch (e) {{
    console.log('{ERROR_MARKER} ' + (e && e.message));
  }}
}})();
"#
        )),
        Language::C | Language::Cpp | Language::Java | Language::Go | Language::Shell => None,
    }
}

/// Read the harness markers back out of stdout.
fn parse_harness_output(stdout: &str, stderr: &str) -> (Option<Value>, Option<String>) {
    let marked = |marker: &str| {
        stdout
            .lines()
            .rev()
            .find_map(|line| line.split_once(marker).map(|(_, rest)| rest.trim().to_string()))
    };
    if let Some(raw) = marked(RESULT_MARKER) {
        return match serde_json::from_str(&raw) {
            Ok(value) => (Some(value), None),
            Err(e) => (None, Some(format!("unreadable result '{raw}': {e}"))),
        };
    }
    if let Some(message) = marked(ERROR_MARKER) {
        return (None, Some(message));
    }
    let last = stderr.lines().rev().find(|l| !l.trim().is_empty());
    (None, Some(last.unwrap_or("no output").trim().to_string()))
}

/// Structural equality with numeric tolerance.
pub fn values_match(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Number(e), Value::Number(a)) => match (e.as_f64(), a.as_f64()) {
            (Some(e), Some(a)) => (e - a).abs() < TOLERANCE,
            _ => e == a,
        },
        (Value::Array(e), Value::Array(a)) => {
            e.len() == a.len() && e.iter().zip(a).all(|(e, a)| values_match(e, a))
        }
        (Value::Object(e), Value::Object(a)) => {
            e.len() == a.len()
                && e.iter()
                    .all(|(k, ev)| a.get(k).is_some_and(|av| values_match(ev, av)))
        }
        _ => expected == actual,
    }
}

/// Run every case through `executor`. `Err` only for sandbox faults.
pub async fn run_cases(
    executor: &dyn Executor,
    language: Language,
    source: &str,
    cases: &[TestCase],
    limits: &ResourceLimits,
) -> Result<Vec<CaseResult>> {
    let mut results = Vec::with_capacity(cases.len());
    for case in cases {
        let Some(program) = harness(language, source, case) else {
            continue;
        };
        let run = executor.run_source(&program, language, limits).await?;
        let (actual, error) = parse_harness_output(&run.stdout, &run.stderr);
        let passed = actual
            .as_ref()
            .is_some_and(|value| values_match(&case.expected, value));
        debug!(case = %case.name, passed, "test case finished");
        results.push(CaseResult {
            case: case.clone(),
            actual,
            error,
            passed,
        });
    }
    Ok(results)
}

/// One finding per failing case.
pub fn findings_for(results: &[CaseResult]) -> Vec<LogicalFinding> {
    results
        .iter()
        .filter(|r| !r.passed)
        .map(|r| {
            let expected = &r.case.expected;
            let actual = r.actual.clone().unwrap_or(Value::Null);
            let (category, severity, confidence) = classify_failure(expected, &actual);
            let mut message = format!(
                "Test '{}' failed: expected {expected}, got {actual}",
                r.case.name
            );
            if let Some(error) = &r.error {
                message.push_str(&format!(" ({error})"));
            }
            LogicalFinding::new(category, None, severity, confidence, message)
        })
        .collect()
}

fn classify_failure(expected: &Value, actual: &Value) -> (FindingCategory, Severity, f32) {
    if actual.is_null() {
        return (FindingCategory::BoundaryError, Severity::Medium, 0.8);
    }
    if let (Some(e), Some(a)) = (expected.as_f64(), actual.as_f64()) {
        if ((a - e).abs() - 1.0).abs() < TOLERANCE {
            return (FindingCategory::OffByOne, Severity::High, 0.9);
        }
        if e != 0.0 {
            let ratio = a / e;
            if (ratio - 2.0).abs() < TOLERANCE || (ratio - 0.5).abs() < TOLERANCE {
                return (FindingCategory::WrongOperator, Severity::Medium, 0.7);
            }
        }
    }
    (FindingCategory::OutputMismatch, Severity::Medium, 0.8)
}

/// Parse, run and classify in one step. Empty when the source has no
/// cases or the language has no harness.
pub async fn diagnose(
    executor: &dyn Executor,
    language: Language,
    source: &str,
    limits: &ResourceLimits,
) -> Result<Vec<LogicalFinding>> {
    if !supports(language) {
        return Ok(Vec::new());
    }
    let cases = parse_test_cases(source);
    if cases.is_empty() {
        return Ok(Vec::new());
    }
    let results = run_cases(executor, language, source, &cases, limits).await?;
    Ok(findings_for(&results))
}
