use mender_core::domain::finding::top_priority;
use mender_core::{analyze_for, inspect_output, ErrorKind, ErrorRecord, FindingCategory, Language};

const OFF_BY_ONE: &str = "def total_of(arr, n):\n    total = 0\n    for i in range(1, n):\n        total += arr[i]\n    return total\n";

fn categories(language: Language, source: &str) -> Vec<(FindingCategory, Option<u32>)> {
    analyze_for(language, source)
        .into_iter()
        .map(|f| (f.category, f.line))
        .collect()
}

// ── Python ──────────────────────────────────────────────────────────────

#[test]
fn off_by_one_reported_once_at_loop_line() {
    assert_eq!(
        categories(Language::Python, OFF_BY_ONE),
        vec![(FindingCategory::OffByOne, Some(3))]
    );
}

#[test]
fn unreachable_reported_at_first_dead_statement() {
    let source = "def f():\n    return 1\n    print('a')\n    print('b')\n";
    assert_eq!(
        categories(Language::Python, source),
        vec![(FindingCategory::UnreachableCode, Some(3))]
    );
}

#[test]
fn try_finally_around_return_is_clean() {
    let source = "def read(path):\n    f = open(path)\n    try:\n        return f.read()\n    finally:\n        f.close()\n";
    assert!(analyze_for(Language::Python, source).is_empty());
}

#[test]
fn findings_are_ordered_by_line_and_ranked_for_repair() {
    let source = format!("{OFF_BY_ONE}\n\ndef f():\n    return 1\n    print('a')\n");
    let findings = analyze_for(Language::Python, &source);
    assert_eq!(
        findings
            .iter()
            .map(|f| (f.category, f.line))
            .collect::<Vec<_>>(),
        vec![
            (FindingCategory::OffByOne, Some(3)),
            (FindingCategory::UnreachableCode, Some(10)),
        ]
    );

    let top = top_priority(&findings).unwrap();
    let diagnosis = ErrorRecord::from_finding(top, &source);
    assert_eq!(
        diagnosis.kind,
        Some(ErrorKind::Logical {
            category: FindingCategory::OffByOne
        })
    );
    assert_eq!(diagnosis.line, Some(3));
    assert_eq!(diagnosis.snippet.as_deref(), Some("for i in range(1, n):"));
    assert!(diagnosis.suggested_fix.is_some());
}

#[test]
fn output_mismatch_outranks_static_findings() {
    let mut findings = analyze_for(Language::Python, OFF_BY_ONE);
    findings.extend(inspect_output("Sum of first 10 (expect 55): 45\n"));
    assert_eq!(findings.len(), 2);
    assert_eq!(
        top_priority(&findings).unwrap().category,
        FindingCategory::OutputMismatch
    );
}

#[test]
fn unparsable_python_yields_nothing() {
    assert!(analyze_for(Language::Python, "def broken(:\n    return 1\n").is_empty());
}

// ── Other languages ─────────────────────────────────────────────────────

#[test]
fn pattern_checks_cover_compiled_languages() {
    assert_eq!(
        categories(
            Language::Cpp,
            "int main() {\n    while (true) {\n        tick();\n    }\n}\n"
        ),
        vec![(FindingCategory::InfiniteLoop, Some(2))]
    );
    assert_eq!(
        categories(
            Language::Go,
            "package main\n\nfunc main() {\n\tfor {\n\t\tstep()\n\t}\n}\n"
        ),
        vec![(FindingCategory::InfiniteLoop, Some(4))]
    );
    assert_eq!(
        categories(
            Language::JavaScript,
            "function check(x) {\n  if (x = 5) {\n    return 1;\n  }\n}\n"
        ),
        vec![(FindingCategory::WrongComparison, Some(2))]
    );
}

#[test]
fn shell_has_no_analyzer() {
    assert!(analyze_for(Language::Shell, "while true; do :; done\n").is_empty());
}
