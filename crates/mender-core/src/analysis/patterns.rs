//! Line-pattern checks for the brace languages.
//!
//! No parser here: each check is a regex over source lines, so confidence
//! stays below the Python checks.

use mender_sandbox::Language;

use crate::domain::finding::normalize;
use crate::domain::{FindingCategory, LogicalFinding, Severity};

/// How far below an unconditional loop header a `break` is searched for.
const BREAK_WINDOW: usize = 20;

pub fn analyze(language: Language, source: &str) -> Vec<LogicalFinding> {
    let lines: Vec<&str> = source.lines().collect();
    let mut findings = Vec::new();
    match language {
        Language::C | Language::Cpp | Language::Java | Language::JavaScript | Language::Go => {
            unconditional_loops(language, &lines, &mut findings);
            counted_loops(&lines, &mut findings);
            empty_statement_headers(&lines, &mut findings);
            if language != Language::Go {
                assignment_in_condition(&lines, &mut findings);
            }
            if language != Language::JavaScript {
                typed_functions_without_return(language, &lines, &mut findings);
            }
        }
        Language::Python | Language::Shell => {}
    }
    normalize(findings)
}

fn line_no(idx: usize) -> Option<u32> {
    Some(idx as u32 + 1)
}

fn strip_line_comment(line: &str) -> &str {
    line.split("//").next().unwrap_or(line)
}

fn unconditional_loops(language: Language, lines: &[&str], out: &mut Vec<LogicalFinding>) {
    let c_style = static_regex!(r"\bwhile\s*\(\s*(?:true|1)\s*\)|\bfor\s*\(\s*;\s*;\s*\)");
    let go_style = static_regex!(r"^\s*for\s*\{");
    let break_re = static_regex!(r"\bbreak\b");

    for (idx, line) in lines.iter().enumerate() {
        let code = strip_line_comment(line);
        let header = if language == Language::Go {
            go_style.is_match(code)
        } else {
            c_style.is_match(code)
        };
        if !header {
            continue;
        }
        let window_end = (idx + 1 + BREAK_WINDOW).min(lines.len());
        if lines[idx..window_end].iter().any(|l| break_re.is_match(l)) {
            continue;
        }
        out.push(
            LogicalFinding::new(
                FindingCategory::InfiniteLoop,
                line_no(idx),
                Severity::High,
                0.7,
                "Unconditional loop with no break nearby",
            )
            .with_fix("Add a break condition or bound the loop"),
        );
    }
}

fn counted_loops(lines: &[&str], out: &mut Vec<LogicalFinding>) {
    let re = static_regex!(
        r"\bfor\s*\(?\s*(?:(?:int|long|size_t|let|var|auto)\s+)?(\w+)\s*:?=\s*1\s*;\s*(\w+)\s*<=\s*[^;]+;"
    );
    for (idx, line) in lines.iter().enumerate() {
        let Some(caps) = re.captures(strip_line_comment(line)) else {
            continue;
        };
        if caps[1] != caps[2] {
            continue;
        }
        out.push(
            LogicalFinding::new(
                FindingCategory::OffByOne,
                line_no(idx),
                Severity::Medium,
                0.5,
                format!("Loop runs '{}' from 1 through the bound inclusively", &caps[1]),
            )
            .with_fix("Start at 0 and use '<' if the bound is a length"),
        );
    }
}

fn empty_statement_headers(lines: &[&str], out: &mut Vec<LogicalFinding>) {
    let re = static_regex!(r"^\s*(?:if|while|for)\s*\(.*\)\s*;\s*$");
    for (idx, line) in lines.iter().enumerate() {
        if re.is_match(strip_line_comment(line)) {
            out.push(
                LogicalFinding::new(
                    FindingCategory::DeadCode,
                    line_no(idx),
                    Severity::Low,
                    0.7,
                    "Control statement has an empty body (stray ';')",
                )
                .with_fix("Remove the ';' after the condition"),
            );
        }
    }
}

fn assignment_in_condition(lines: &[&str], out: &mut Vec<LogicalFinding>) {
    let re = static_regex!(r"\bif\s*\((.*)\)");
    for (idx, line) in lines.iter().enumerate() {
        let Some(caps) = re.captures(strip_line_comment(line)) else {
            continue;
        };
        if !has_bare_assignment(&caps[1]) {
            continue;
        }
        out.push(
            LogicalFinding::new(
                FindingCategory::WrongComparison,
                line_no(idx),
                Severity::Medium,
                0.6,
                "Assignment inside an 'if' condition",
            )
            .with_fix("Use '==' to compare"),
        );
    }
}

/// A single `=` that is not part of `==`, `!=`, `<=`, `>=`, `=>` or `===`.
fn has_bare_assignment(condition: &str) -> bool {
    let bytes = condition.as_bytes();
    bytes.iter().enumerate().any(|(i, &b)| {
        if b != b'=' {
            return false;
        }
        let prev = i.checked_sub(1).map(|p| bytes[p]);
        let next = bytes.get(i + 1).copied();
        !matches!(prev, Some(b'=' | b'!' | b'<' | b'>'))
            && !matches!(next, Some(b'=' | b'>'))
    })
}

fn typed_functions_without_return(
    language: Language,
    lines: &[&str],
    out: &mut Vec<LogicalFinding>,
) {
    let c_like = static_regex!(
        r"^\s*(?:(?:public|private|protected|static|final|inline|const)\s+)*(?:int|long|short|double|float|bool|boolean|char|String|std::string|size_t)\s*[*&]?\s+(\w+)\s*\([^;]*\)\s*\{?\s*$"
    );
    let go_like = static_regex!(
        r"^\s*func\s+(?:\([^)]*\)\s*)?(\w+)\s*\([^)]*\)\s*(?:[\w\[\]*.]+|\([^)]*\))\s*\{\s*$"
    );
    let return_re = static_regex!(r"\breturn\b");

    for (idx, line) in lines.iter().enumerate() {
        let header = if language == Language::Go {
            go_like.captures(line)
        } else {
            c_like.captures(line)
        };
        let Some(caps) = header else {
            continue;
        };
        let name = caps[1].to_string();
        // `main` may fall off the end in C and C++.
        if name == "main" {
            continue;
        }
        let Some(body) = function_body(lines, idx) else {
            continue;
        };
        if return_re.is_match(&body) {
            continue;
        }
        out.push(
            LogicalFinding::new(
                FindingCategory::MissingReturn,
                line_no(idx),
                Severity::Medium,
                0.7,
                format!("Function '{name}' declares a return type but never returns"),
            )
            .with_fix(format!("Add a return statement to '{name}'")),
        );
    }
}

/// Text between the first `{` at or after `start` and its matching `}`.
fn function_body(lines: &[&str], start: usize) -> Option<String> {
    let mut depth = 0usize;
    let mut opened = false;
    let mut body = String::new();
    for line in &lines[start..] {
        for ch in strip_line_comment(line).chars() {
            match ch {
                '{' => {
                    depth += 1;
                    opened = true;
                }
                '}' if opened => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Some(body);
                    }
                }
                _ => {}
            }
            if opened {
                body.push(ch);
            }
        }
        body.push('\n');
        // A prototype or a header with its brace far away.
        if !opened && body.len() > 512 {
            return None;
        }
    }
    None
}
