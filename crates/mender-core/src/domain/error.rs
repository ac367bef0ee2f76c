//! Error taxonomy for the repair engine.
//!
//! These are faults of the engine or its configuration. A repair that cannot
//! make progress is not an error: it ends in a [`super::RepairOutcome`] whose
//! status and reason say why.

use mender_sandbox::{Language, SandboxError};

/// Repair engine errors.
#[derive(Debug, thiserror::Error)]
pub enum MenderError {
    #[error("sandbox error: {0}")]
    Sandbox(#[from] SandboxError),

    #[error("invalid repair configuration: {0}")]
    Config(String),

    #[error("no generator registered for {0}")]
    UnsupportedLanguage(Language),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for repair engine operations.
pub type Result<T> = std::result::Result<T, MenderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mender_error_display() {
        let err = MenderError::Config("max_candidates must be > 0".to_string());
        assert!(err.to_string().contains("invalid repair configuration"));

        let err = MenderError::UnsupportedLanguage(Language::Go);
        assert_eq!(err.to_string(), "no generator registered for go");
    }

    #[test]
    fn test_sandbox_error_converts() {
        let err: MenderError = SandboxError::UnsupportedLanguage(Language::Java).into();
        assert!(matches!(err, MenderError::Sandbox(_)));
        assert!(err.to_string().contains("java"));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.py");
        let err: MenderError = io.into();
        assert!(err.to_string().contains("missing.py"));
    }
}
