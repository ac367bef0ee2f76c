//! Source languages understood by the sandbox.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SandboxError};

/// A source language with a registered toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    /// Reference language: full structural analysis.
    Python,
    C,
    Cpp,
    Java,
    #[serde(rename = "javascript")]
    JavaScript,
    Go,
    /// POSIX shell scripts.
    Shell,
}

impl Language {
    /// Every supported language, in a stable order.
    pub const ALL: [Language; 7] = [
        Language::Python,
        Language::C,
        Language::Cpp,
        Language::Java,
        Language::JavaScript,
        Language::Go,
        Language::Shell,
    ];

    /// Lowercase identifier used in logs and configuration.
    pub fn name(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Java => "java",
            Language::JavaScript => "javascript",
            Language::Go => "go",
            Language::Shell => "shell",
        }
    }

    /// Map a file extension (without the dot) to a language.
    pub fn from_extension(ext: &str) -> Option<Language> {
        match ext.to_ascii_lowercase().as_str() {
            "py" => Some(Language::Python),
            "c" => Some(Language::C),
            "cpp" | "cc" | "cxx" => Some(Language::Cpp),
            "java" => Some(Language::Java),
            "js" | "mjs" => Some(Language::JavaScript),
            "go" => Some(Language::Go),
            "sh" => Some(Language::Shell),
            _ => None,
        }
    }

    /// Detect the language of a file from its extension.
    pub fn detect(path: &Path) -> Result<Language> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Language::from_extension)
            .ok_or_else(|| SandboxError::UnknownExtension(path.display().to_string()))
    }

    /// Whether the language runs through a separate compile step by default.
    pub fn is_compiled(&self) -> bool {
        matches!(self, Language::C | Language::Cpp | Language::Java | Language::Go)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
