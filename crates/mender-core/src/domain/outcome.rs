//! Iteration history and the terminal repair outcome.

use serde::{Deserialize, Serialize};

use super::diagnosis::{ErrorKind, ErrorRecord};
use super::patch::{PatchKind, ScoredPatch};

/// How one iteration ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IterationStatus {
    /// The committed patch made the source exit 0, or the source was
    /// already clean.
    Fixed,
    /// A patch was committed but the source still needs work.
    Retrying,
    /// The loop stopped in this iteration.
    Failed,
}

/// The committed candidate, as recorded in history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppliedPatch {
    pub id: String,
    pub description: String,
    pub kind: PatchKind,
    pub score: i64,
}

impl From<&ScoredPatch> for AppliedPatch {
    fn from(scored: &ScoredPatch) -> Self {
        Self {
            id: scored.candidate.id.clone(),
            description: scored.candidate.description.clone(),
            kind: scored.candidate.kind,
            score: scored.score,
        }
    }
}

/// One entry of the append-only iteration history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IterationRecord {
    /// 1-indexed.
    pub index: u32,
    pub diagnosis: Option<ErrorRecord>,
    pub applied_patch: Option<AppliedPatch>,
    pub status: IterationStatus,
}

/// Terminal status of a repair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RepairStatus {
    Success,
    Failed,
    MaxIterationsReached,
}

/// Score summary of one candidate, kept for post-mortems.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CandidateScore {
    pub id: String,
    pub score: i64,
}

/// Why a repair stopped without success.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FailureReason {
    /// Spawn failure, missing toolchain, or a sandbox fault.
    Environment { message: String },
    /// Neither diagnostic shape matched the failing run.
    Undiagnosable { exit_code: i32 },
    /// The generator produced nothing usable.
    NoCandidates { kind: Option<ErrorKind> },
    /// Candidates existed but none scored positively.
    NoSuitablePatch { scored: Vec<CandidateScore> },
    /// The iteration budget ran out.
    BudgetExhausted { max_iterations: u32 },
}

impl FailureReason {
    pub fn describe(&self) -> String {
        match self {
            FailureReason::Environment { message } => format!("environment failure: {message}"),
            FailureReason::Undiagnosable { exit_code } => {
                format!("could not diagnose failure (exit code {exit_code})")
            }
            FailureReason::NoCandidates { .. } => "no patches available".to_string(),
            FailureReason::NoSuitablePatch { scored } => {
                format!("no suitable patch among {} candidate(s)", scored.len())
            }
            FailureReason::BudgetExhausted { max_iterations } => {
                format!("iteration budget of {max_iterations} exhausted")
            }
        }
    }
}

/// Terminal result of one repair invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepairOutcome {
    pub success: bool,
    pub final_source: String,
    pub iterations: Vec<IterationRecord>,
    pub status: RepairStatus,
    pub reason: Option<FailureReason>,
}

impl RepairOutcome {
    pub fn total_iterations(&self) -> usize {
        self.iterations.len()
    }

    /// Ids of every committed patch, in order.
    pub fn applied_patch_ids(&self) -> Vec<&str> {
        self.iterations
            .iter()
            .filter_map(|it| it.applied_patch.as_ref())
            .map(|p| p.id.as_str())
            .collect()
    }
}
