//! Error types for the sandbox layer.

use crate::language::Language;

/// Faults of the sandbox itself.
///
/// A program that crashes, times out or fails to compile is *not* an error:
/// those are reported through [`crate::ExecStatus`] on a successful call.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("no toolchain registered for {0}")]
    UnsupportedLanguage(Language),

    #[error("cannot infer language from {0}")]
    UnknownExtension(String),

    #[error("invalid sandbox configuration: {0}")]
    InvalidConfig(String),

    #[error("sandbox i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for sandbox operations.
pub type Result<T> = std::result::Result<T, SandboxError>;
