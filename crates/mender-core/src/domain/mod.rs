//! Domain models for the repair engine.
//!
//! - `ErrorRecord` / `ErrorKind`: normalized failure diagnoses
//! - `LogicalFinding`: non-crashing defects from static or output analysis
//! - `PatchCandidate` / `ScoredPatch`: proposed and evaluated fixes
//! - `IterationRecord` / `RepairOutcome`: loop history and result

pub mod diagnosis;
pub mod error;
pub mod finding;
pub mod outcome;
pub mod patch;

pub use diagnosis::{source_line, ErrorKind, ErrorRecord};
pub use error::{MenderError, Result};
pub use finding::{FindingCategory, LogicalFinding, Severity};
pub use outcome::{
    AppliedPatch, CandidateScore, FailureReason, IterationRecord, IterationStatus, RepairOutcome,
    RepairStatus,
};
pub use patch::{source_fingerprint, PatchCandidate, PatchKind, ScoreBreakdown, ScoredPatch};
