//! Error signal extraction.
//!
//! Turns a failing [`SandboxResult`] into an [`ErrorRecord`]. Two shapes are
//! tried in order:
//!
//! 1. the pre-execution diagnostic shape a parser or compiler prints (file
//!    and line pointer, optional caret, category name);
//! 2. the post-execution stack-unwind shape, pairing the innermost frame in
//!    the user's own file with the final `Category: message` line.
//!
//! Native crashes without either shape fall back to the signal the process
//! died from.

use mender_sandbox::{ExecStatus, Language, SandboxResult};

use crate::domain::{source_line, ErrorKind, ErrorRecord};

/// Diagnose a sandbox result against the source that produced it.
pub fn extract(result: &SandboxResult, source: &str) -> ErrorRecord {
    match result.status {
        ExecStatus::SpawnFailed => return ErrorRecord::none(),
        ExecStatus::TimedOut => {
            return ErrorRecord::new(ErrorKind::TimedOut).with_message(result.stderr.trim())
        }
        ExecStatus::MemoryExceeded => {
            let mut record = ErrorRecord::new(ErrorKind::MemoryExceeded)
                .with_message("memory limit exceeded");
            if let Some(unwound) = unwind_shape(result, source) {
                record.line = unwound.line;
                record.snippet = unwound.snippet;
            }
            return record;
        }
        ExecStatus::Completed if result.exit_code == 0 => return ErrorRecord::none(),
        ExecStatus::Completed | ExecStatus::CompileFailed => {}
    }

    diagnostic_shape(result, source)
        .or_else(|| unwind_shape(result, source))
        .or_else(|| signal_shape(result, source))
        .unwrap_or_default()
}

/// Kind named by the last `XError:` / `XException:` / `XWarning:` line.
pub fn classify_stderr(stderr: &str) -> Option<ErrorKind> {
    let re = static_regex!(r"(\w+(?:Error|Exception|Warning)):");
    stderr
        .lines()
        .rev()
        .find_map(|line| re.captures(line))
        .map(|caps| ErrorKind::from_exception_name(&caps[1]))
}

/// File name the user's source was written to inside the sandbox.
fn user_file_name(result: &SandboxResult) -> String {
    let from_command = result.executed_command.iter().find_map(|arg| {
        let name = arg.rsplit('/').next().unwrap_or(arg);
        let (_, ext) = name.rsplit_once('.')?;
        (Language::from_extension(ext) == Some(result.language)).then(|| name.to_string())
    });
    if let Some(name) = from_command {
        return name;
    }
    match result.language {
        Language::Java => format!(
            "{}.java",
            result.executed_command.last().map(String::as_str).unwrap_or("Main")
        ),
        Language::Python => "main.py".to_string(),
        Language::C => "main.c".to_string(),
        Language::Cpp => "main.cpp".to_string(),
        Language::JavaScript => "main.js".to_string(),
        Language::Go => "main.go".to_string(),
        Language::Shell => "main.sh".to_string(),
    }
}

fn is_user_file(path: &str, user_file: &str) -> bool {
    path.rsplit('/').next() == Some(user_file)
}

fn parse_line(text: &str) -> Option<u32> {
    text.parse().ok()
}

/// Snippet for `line`: the source line, falling back to what the output showed.
fn snippet_for(source: &str, line: Option<u32>, printed: Option<&str>) -> Option<String> {
    line.and_then(|l| source_line(source, l)).or_else(|| {
        printed
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

// ---------------------------------------------------------------------------
// Shape 1: pre-execution diagnostics
// ---------------------------------------------------------------------------

fn diagnostic_shape(result: &SandboxResult, source: &str) -> Option<ErrorRecord> {
    let stderr = result.stderr.as_str();
    match result.language {
        Language::Python => python_syntax(stderr, source),
        Language::JavaScript => node_syntax(stderr, source),
        Language::C | Language::Cpp if result.status == ExecStatus::CompileFailed => {
            gcc_diagnostic(stderr, source)
        }
        Language::Java if result.status == ExecStatus::CompileFailed => {
            javac_diagnostic(stderr, source)
        }
        Language::Go if result.status == ExecStatus::CompileFailed => {
            go_diagnostic(stderr, source)
        }
        Language::Shell => shell_diagnostic(stderr, source),
        _ => None,
    }
}

fn python_syntax(stderr: &str, source: &str) -> Option<ErrorRecord> {
    let kind_re = static_regex!(r"^(SyntaxError|IndentationError|TabError):\s*(.*)$");
    let frame_re = static_regex!(r#"File\s+"[^"]+",\s+line\s+(\d+)"#);

    let lines: Vec<&str> = stderr.lines().collect();
    let (kind_idx, caps) = lines
        .iter()
        .enumerate()
        .rev()
        .find_map(|(idx, line)| kind_re.captures(line.trim()).map(|c| (idx, c)))?;

    let kind = ErrorKind::from_exception_name(&caps[1]);
    let message = caps[2].trim().to_string();

    let frame = lines[..kind_idx]
        .iter()
        .enumerate()
        .rev()
        .find_map(|(idx, line)| frame_re.captures(line).map(|c| (idx, c)));
    let line = frame.as_ref().and_then(|(_, c)| parse_line(&c[1]));
    let printed = frame.and_then(|(idx, _)| lines.get(idx + 1).copied());

    let mut record = ErrorRecord::new(kind).with_message(message);
    record.line = line;
    record.snippet = snippet_for(source, line, printed);
    Some(record)
}

fn node_syntax(stderr: &str, source: &str) -> Option<ErrorRecord> {
    let header_re = static_regex!(r"^(\S+\.m?js):(\d+)$");
    let kind_re = static_regex!(r"^SyntaxError:\s*(.*)$");

    let lines: Vec<&str> = stderr.lines().collect();
    let message = lines
        .iter()
        .find_map(|line| kind_re.captures(line.trim()))?[1]
        .trim()
        .to_string();

    let header = lines
        .iter()
        .enumerate()
        .find_map(|(idx, line)| header_re.captures(line.trim()).map(|c| (idx, c)));
    let line = header.as_ref().and_then(|(_, c)| parse_line(&c[2]));
    let printed = header.and_then(|(idx, _)| lines.get(idx + 1).copied());

    let mut record = ErrorRecord::new(ErrorKind::Syntax).with_message(message);
    record.line = line;
    record.snippet = snippet_for(source, line, printed);
    Some(record)
}

fn gcc_diagnostic(stderr: &str, source: &str) -> Option<ErrorRecord> {
    let error_re = static_regex!(
        r"(?m)^[^\s:]*\.(?:c|cc|cpp|cxx|h|hpp):(\d+):(\d+):\s*(?:fatal\s+)?error:\s*(.+)$"
    );
    let link_re = static_regex!(r"undefined reference to [`'](\w+)'");

    if let Some(caps) = error_re.captures(stderr) {
        let line = parse_line(&caps[1]);
        let message = caps[3].trim().to_string();
        let kind = classify_compiler_message(&message);
        let mut record = ErrorRecord::new(kind).with_message(message);
        record.line = line;
        record.snippet = snippet_for(source, line, None);
        return Some(record);
    }

    link_re.captures(stderr).map(|caps| {
        ErrorRecord::new(ErrorKind::Link)
            .with_message(format!("undefined reference to '{}'", &caps[1]))
    })
}

fn javac_diagnostic(stderr: &str, source: &str) -> Option<ErrorRecord> {
    let error_re = static_regex!(r"(?m)^[^\s:]+\.java:(\d+):\s*error:\s*(.+)$");
    let caps = error_re.captures(stderr)?;
    let line = parse_line(&caps[1]);
    let message = caps[2].trim().to_string();
    let kind = classify_compiler_message(&message);
    let mut record = ErrorRecord::new(kind).with_message(message);
    record.line = line;
    record.snippet = snippet_for(source, line, None);
    Some(record)
}

fn go_diagnostic(stderr: &str, source: &str) -> Option<ErrorRecord> {
    let error_re = static_regex!(r"(?m)^\S*\.go:(\d+):(?:\d+:)?\s*(.+)$");
    let caps = error_re.captures(stderr)?;
    let line = parse_line(&caps[1]);
    let message = caps[2].trim().to_string();
    let kind = classify_compiler_message(&message);
    let mut record = ErrorRecord::new(kind).with_message(message);
    record.line = line;
    record.snippet = snippet_for(source, line, None);
    Some(record)
}

/// Map a compiler message to a kind.
/// dash prints `main.sh: 3: msg`, bash `main.sh: line 3: msg`.
fn shell_diagnostic(stderr: &str, source: &str) -> Option<ErrorRecord> {
    let error_re = static_regex!(r"(?m)^[^\s:]*\.sh:\s*(?:line\s+)?(\d+):\s*(.+)$");
    let caps = error_re.captures(stderr)?;
    let line = parse_line(&caps[1]);
    let message = caps[2].trim().to_string();
    let lower = message.to_lowercase();
    let kind = if lower.contains("not found") {
        ErrorKind::UnresolvedReference
    } else if lower.contains("syntax error") || lower.contains("unexpected") {
        ErrorKind::Syntax
    } else {
        ErrorKind::Runtime {
            name: "ShellError".to_string(),
        }
    };
    let mut record = ErrorRecord::new(kind).with_message(message);
    record.line = line;
    record.snippet = snippet_for(source, line, None);
    Some(record)
}

fn classify_compiler_message(message: &str) -> ErrorKind {
    let m = message.to_lowercase();
    if m.contains("syntax error")
        || m.contains("expected")
        || m.contains("unexpected")
        || m.contains("unterminated")
        || m.contains("unclosed")
    {
        ErrorKind::Syntax
    } else if m.contains("undeclared")
        || m.contains("was not declared")
        || m.contains("cannot find symbol")
        || m.starts_with("undefined:")
        || m.contains("implicit declaration")
    {
        ErrorKind::UnresolvedReference
    } else if m.contains("incompatible")
        || m.contains("cannot convert")
        || m.contains("invalid conversion")
        || m.contains("cannot use")
        || m.contains("mismatched types")
    {
        ErrorKind::Type
    } else {
        ErrorKind::Compile
    }
}

// ---------------------------------------------------------------------------
// Shape 2: stack unwinds
// ---------------------------------------------------------------------------

fn unwind_shape(result: &SandboxResult, source: &str) -> Option<ErrorRecord> {
    let user_file = user_file_name(result);
    let stderr = result.stderr.as_str();
    match result.language {
        Language::Python => python_traceback(stderr, source, &user_file),
        Language::JavaScript => node_stack(stderr, source, &user_file),
        Language::Java => java_stack(stderr, source, &user_file),
        Language::Go => go_panic(stderr, source, &user_file),
        Language::C | Language::Cpp => cpp_terminate(stderr),
        Language::Shell => None,
    }
}

fn python_traceback(stderr: &str, source: &str, user_file: &str) -> Option<ErrorRecord> {
    let final_re = static_regex!(r"^([\w.]*(?:Error|Exception|Warning|Exit|Interrupt|Iteration))(?::\s*(.*))?$");
    let frame_re = static_regex!(r#"File\s+"([^"]+)",\s+line\s+(\d+)"#);

    let lines: Vec<&str> = stderr.lines().collect();
    let caps = lines
        .iter()
        .rev()
        .map(|line| line.trim_end())
        .filter(|line| !line.starts_with(' '))
        .find_map(|line| final_re.captures(line))?;
    let name = caps[1].rsplit('.').next().unwrap_or(&caps[1]).to_string();
    let message = caps.get(2).map(|m| m.as_str().trim().to_string());

    // Python prints the innermost frame last.
    let frame = lines.iter().enumerate().rev().find_map(|(idx, line)| {
        frame_re
            .captures(line)
            .filter(|c| is_user_file(&c[1], user_file))
            .map(|c| (idx, parse_line(&c[2])))
    });
    let line = frame.and_then(|(_, line)| line);
    let printed = frame.and_then(|(idx, _)| {
        lines
            .get(idx + 1)
            .copied()
            .filter(|l| !l.trim_start().starts_with("File ") && !l.trim().starts_with('^'))
    });

    let mut record = ErrorRecord::new(ErrorKind::from_exception_name(&name));
    record.message = message.or(Some(name));
    record.line = line;
    record.snippet = snippet_for(source, line, printed);
    Some(record)
}

fn node_stack(stderr: &str, source: &str, user_file: &str) -> Option<ErrorRecord> {
    let final_re = static_regex!(r"^(?:Uncaught\s+)?(\w*(?:Error|Exception)):\s*(.*)$");
    let frame_re = static_regex!(r"^\s*at\s+(?:.*?\()?([^()\s]+?):(\d+):(\d+)\)?$");
    let header_re = static_regex!(r"^(\S+\.m?js):(\d+)$");

    let lines: Vec<&str> = stderr.lines().collect();
    let caps = lines.iter().find_map(|line| final_re.captures(line.trim()))?;
    let name = caps[1].to_string();
    let message = caps[2].trim().to_string();

    // JavaScript prints the innermost frame first.
    let line = lines
        .iter()
        .find_map(|line| {
            frame_re
                .captures(line)
                .filter(|c| is_user_file(&c[1], user_file))
                .and_then(|c| parse_line(&c[2]))
        })
        .or_else(|| {
            lines.iter().find_map(|line| {
                header_re
                    .captures(line.trim())
                    .filter(|c| is_user_file(&c[1], user_file))
                    .and_then(|c| parse_line(&c[2]))
            })
        });

    let kind = if name == "RangeError" && message.contains("call stack") {
        ErrorKind::Recursion
    } else {
        ErrorKind::from_exception_name(&name)
    };
    let mut record = ErrorRecord::new(kind).with_message(message);
    record.line = line;
    record.snippet = snippet_for(source, line, None);
    Some(record)
}

fn java_stack(stderr: &str, source: &str, user_file: &str) -> Option<ErrorRecord> {
    let final_re =
        static_regex!(r#"Exception in thread "[^"]*"\s+([\w.$]+)(?::\s*(.*))?"#);
    let frame_re = static_regex!(r"^\s*at\s+[\w.$<>]+\(([\w$]+\.java):(\d+)\)");

    let caps = final_re.captures(stderr)?;
    let name = caps[1].rsplit('.').next().unwrap_or(&caps[1]).to_string();
    let message = caps
        .get(2)
        .map(|m| m.as_str().trim().to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| name.clone());

    let line = stderr.lines().find_map(|line| {
        frame_re
            .captures(line)
            .filter(|c| is_user_file(&c[1], user_file))
            .and_then(|c| parse_line(&c[2]))
    });

    let mut record = ErrorRecord::new(ErrorKind::from_exception_name(&name)).with_message(message);
    record.line = line;
    record.snippet = snippet_for(source, line, None);
    Some(record)
}

fn go_panic(stderr: &str, source: &str, user_file: &str) -> Option<ErrorRecord> {
    let panic_re = static_regex!(r"(?m)^panic:\s*(.+)$");
    let frame_re = static_regex!(r"^\s+(\S+\.go):(\d+)");

    let message = panic_re.captures(stderr)?[1].trim().to_string();
    let m = message.to_lowercase();
    let kind = if m.contains("divide by zero") {
        ErrorKind::DivideByZero
    } else if m.contains("index out of range") || m.contains("slice bounds out of range") {
        ErrorKind::Index
    } else if m.contains("nil pointer") || m.contains("invalid memory address") || m.contains("nil map") {
        ErrorKind::NullReference
    } else if m.contains("stack overflow") {
        ErrorKind::Recursion
    } else {
        ErrorKind::Panic
    };

    // Goroutine traces list the innermost frame first.
    let line = stderr.lines().find_map(|line| {
        frame_re
            .captures(line)
            .filter(|c| is_user_file(&c[1], user_file))
            .and_then(|c| parse_line(&c[2]))
    });

    let mut record = ErrorRecord::new(kind).with_message(message);
    record.line = line;
    record.snippet = snippet_for(source, line, None);
    Some(record)
}

fn cpp_terminate(stderr: &str) -> Option<ErrorRecord> {
    let re = static_regex!(r"terminate called after throwing an instance of '([\w:]+)'");
    let caps = re.captures(stderr)?;
    let name = caps[1].to_string();
    let kind = match name.as_str() {
        "std::out_of_range" => ErrorKind::Index,
        "std::invalid_argument" => ErrorKind::Value,
        "std::bad_alloc" => ErrorKind::MemoryExceeded,
        _ => ErrorKind::Runtime { name: name.clone() },
    };
    Some(ErrorRecord::new(kind).with_message(name))
}

// ---------------------------------------------------------------------------
// Fallback: native crashes
// ---------------------------------------------------------------------------

const SIGABRT: i32 = 6;
const SIGFPE: i32 = 8;
const SIGSEGV: i32 = 11;

fn signal_shape(result: &SandboxResult, source: &str) -> Option<ErrorRecord> {
    if result.status != ExecStatus::Completed {
        return None;
    }
    match result.exit_code - 128 {
        SIGSEGV => Some(
            ErrorRecord::new(ErrorKind::SegmentationFault).with_message("segmentation fault"),
        ),
        SIGFPE => Some(
            ErrorRecord::new(ErrorKind::DivideByZero).with_message("floating point exception"),
        ),
        SIGABRT => {
            let assert_re = static_regex!(r"\.(?:c|cc|cpp|cxx):(\d+):.*Assertion\s+[`'](.+)' failed");
            if let Some(caps) = assert_re.captures(&result.stderr) {
                let line = parse_line(&caps[1]);
                let mut record = ErrorRecord::new(ErrorKind::Assertion)
                    .with_message(format!("assertion `{}` failed", &caps[2]));
                record.line = line;
                record.snippet = snippet_for(source, line, None);
                Some(record)
            } else {
                Some(
                    ErrorRecord::new(ErrorKind::Runtime {
                        name: "Abort".to_string(),
                    })
                    .with_message("aborted"),
                )
            }
        }
        _ => None,
    }
}
