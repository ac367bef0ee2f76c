//! Normalized error records.

use serde::{Deserialize, Serialize};

use super::finding::{FindingCategory, LogicalFinding};

/// Closed taxonomy of error kinds.
///
/// `Runtime` is the only open-ended variant; it carries the raw category
/// name for errors the taxonomy does not model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ErrorKind {
    Syntax,
    Indentation,
    /// A name that was never defined (`NameError`, `ReferenceError`).
    UnresolvedReference,
    /// A local read before assignment (`UnboundLocalError`).
    UnboundLocal,
    Type,
    Index,
    Key,
    Value,
    Attribute,
    DivideByZero,
    Import,
    Recursion,
    Assertion,
    NullReference,
    /// Compiler diagnostic that is not a plain syntax error.
    Compile,
    Link,
    SegmentationFault,
    Panic,
    TimedOut,
    MemoryExceeded,
    /// Synthetic diagnosis wrapping a logical finding.
    Logical { category: FindingCategory },
    Runtime { name: String },
}

impl ErrorKind {
    /// Map an exception or error class name to a kind.
    pub fn from_exception_name(name: &str) -> ErrorKind {
        match name {
            "SyntaxError" => ErrorKind::Syntax,
            "IndentationError" | "TabError" => ErrorKind::Indentation,
            "NameError" | "ReferenceError" => ErrorKind::UnresolvedReference,
            "UnboundLocalError" => ErrorKind::UnboundLocal,
            "TypeError" | "ClassCastException" => ErrorKind::Type,
            "IndexError"
            | "IndexOutOfBoundsException"
            | "ArrayIndexOutOfBoundsException"
            | "StringIndexOutOfBoundsException" => ErrorKind::Index,
            "KeyError" | "NoSuchElementException" => ErrorKind::Key,
            "ValueError" | "NumberFormatException" | "IllegalArgumentException" => {
                ErrorKind::Value
            }
            "AttributeError" => ErrorKind::Attribute,
            "ZeroDivisionError" | "ArithmeticException" => ErrorKind::DivideByZero,
            "ImportError" | "ModuleNotFoundError" | "ClassNotFoundException" => ErrorKind::Import,
            "RecursionError" | "StackOverflowError" => ErrorKind::Recursion,
            "AssertionError" => ErrorKind::Assertion,
            "NullPointerException" => ErrorKind::NullReference,
            "MemoryError" | "OutOfMemoryError" => ErrorKind::MemoryExceeded,
            other => ErrorKind::Runtime {
                name: other.to_string(),
            },
        }
    }

    /// Kinds whose appearance tends to trigger further errors downstream.
    pub fn is_cascading(&self) -> bool {
        matches!(
            self,
            ErrorKind::Syntax
                | ErrorKind::Indentation
                | ErrorKind::UnresolvedReference
                | ErrorKind::UnboundLocal
        )
    }

    /// Timeout or memory breach.
    pub fn is_resource_violation(&self) -> bool {
        matches!(self, ErrorKind::TimedOut | ErrorKind::MemoryExceeded)
    }

    pub fn label(&self) -> String {
        match self {
            ErrorKind::Syntax => "syntax".to_string(),
            ErrorKind::Indentation => "indentation".to_string(),
            ErrorKind::UnresolvedReference => "unresolved_reference".to_string(),
            ErrorKind::UnboundLocal => "unbound_local".to_string(),
            ErrorKind::Type => "type".to_string(),
            ErrorKind::Index => "index".to_string(),
            ErrorKind::Key => "key".to_string(),
            ErrorKind::Value => "value".to_string(),
            ErrorKind::Attribute => "attribute".to_string(),
            ErrorKind::DivideByZero => "divide_by_zero".to_string(),
            ErrorKind::Import => "import".to_string(),
            ErrorKind::Recursion => "recursion".to_string(),
            ErrorKind::Assertion => "assertion".to_string(),
            ErrorKind::NullReference => "null_reference".to_string(),
            ErrorKind::Compile => "compile".to_string(),
            ErrorKind::Link => "link".to_string(),
            ErrorKind::SegmentationFault => "segmentation_fault".to_string(),
            ErrorKind::Panic => "panic".to_string(),
            ErrorKind::TimedOut => "timed_out".to_string(),
            ErrorKind::MemoryExceeded => "memory_exceeded".to_string(),
            ErrorKind::Logical { category } => format!("logical:{}", category.name()),
            ErrorKind::Runtime { name } => format!("runtime:{name}"),
        }
    }
}

/// Why an execution failed, normalized across languages.
///
/// `kind == None` means "no error".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub kind: Option<ErrorKind>,

    /// 1-indexed line in the user's source.
    pub line: Option<u32>,

    pub message: Option<String>,

    /// The offending source line, trimmed.
    pub snippet: Option<String>,

    pub suggested_fix: Option<String>,
}

impl ErrorRecord {
    /// The "no error" record.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    /// Set the line (builder pattern).
    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    /// Set the message (builder pattern).
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Set the snippet (builder pattern).
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.kind.is_some()
    }

    /// Wrap a logical finding as a synthetic diagnosis.
    pub fn from_finding(finding: &LogicalFinding, source: &str) -> Self {
        let snippet = finding.line.and_then(|line| source_line(source, line));
        Self {
            kind: Some(ErrorKind::Logical {
                category: finding.category,
            }),
            line: finding.line,
            message: Some(finding.message.clone()),
            snippet,
            suggested_fix: finding.suggested_fix.clone(),
        }
    }
}

/// The trimmed text of a 1-indexed line, if it exists and is not blank.
pub fn source_line(source: &str, line: u32) -> Option<String> {
    let idx = (line as usize).checked_sub(1)?;
    source
        .lines()
        .nth(idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
