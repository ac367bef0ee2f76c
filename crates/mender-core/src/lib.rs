//! mender core library
//!
//! A bounded, replayable repair loop over untrusted source files: run the
//! source in the sandbox, diagnose the failure (or a logical defect of a
//! clean run), evaluate generated candidate fixes empirically and commit
//! the best one.

/// Compile a regex literal once per call site.
macro_rules! static_regex {
    ($pattern:expr) => {{
        static RE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
        RE.get_or_init(|| regex::Regex::new($pattern).expect("static pattern"))
    }};
}

pub mod analysis;
pub mod config;
pub mod controller;
pub mod domain;
pub mod evaluate;
pub mod extract;
pub mod generate;
pub mod metrics;
pub mod obs;
pub mod persistence;
pub mod source_diff;
pub mod telemetry;
pub mod test_cases;

pub use analysis::{analyze_for, inspect_output};
pub use config::RepairConfig;
pub use controller::RepairController;
pub use domain::{
    AppliedPatch, CandidateScore, ErrorKind, ErrorRecord, FailureReason, FindingCategory,
    IterationRecord, IterationStatus, LogicalFinding, MenderError, PatchCandidate, PatchKind,
    RepairOutcome, RepairStatus, Result, ScoreBreakdown, ScoredPatch, Severity,
};
pub use evaluate::{score, select, select_against, Selection};
pub use extract::extract;
pub use generate::{CandidateGenerator, GeneratorRegistry, RuleFilter};
pub use persistence::{BackupRecord, BackupSink, FsBackupSink, MemoryBackupSink, NullBackupSink};
pub use test_cases::{parse_test_cases, TestCase};

pub use mender_sandbox::{
    ExecStatus, Executor, Language, ResourceLimits, SandboxEngine, SandboxResult, ToolchainTable,
};
