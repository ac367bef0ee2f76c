//! Patch candidates and their scores.

use mender_sandbox::SandboxResult;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::source_diff;

/// What a candidate tries to improve.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PatchKind {
    Correctness,
    Efficiency,
}

/// One complete proposed replacement for the source.
///
/// Never mutated after creation: every field is fixed by the generator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatchCandidate {
    /// Rule identifier; the rule filter matches on it.
    pub id: String,
    pub description: String,
    pub patched_source: String,
    /// Unified diff against the source the candidate was generated from.
    pub diff: String,
    pub kind: PatchKind,
    /// The generator's designated primary fix.
    pub primary: bool,
}

impl PatchCandidate {
    /// Build a correctness candidate, computing its diff against `original`.
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        original: &str,
        patched_source: impl Into<String>,
    ) -> Self {
        let patched_source = patched_source.into();
        let diff = source_diff::unified_diff(original, &patched_source, "source");
        Self {
            id: id.into(),
            description: description.into(),
            patched_source,
            diff,
            kind: PatchKind::Correctness,
            primary: false,
        }
    }

    /// Mark as the generator's primary fix (builder pattern).
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    /// Set the kind (builder pattern).
    pub fn with_kind(mut self, kind: PatchKind) -> Self {
        self.kind = kind;
        self
    }

    /// Number of changed lines in the diff.
    pub fn changed_lines(&self) -> usize {
        source_diff::changed_lines(&self.diff)
    }

    /// SHA-256 hex digest of the patched source.
    pub fn fingerprint(&self) -> String {
        source_fingerprint(&self.patched_source)
    }
}

/// SHA-256 hex digest of a source text.
pub fn source_fingerprint(source: &str) -> String {
    hex::encode(Sha256::digest(source.as_bytes()))
}

/// Each additive scoring term, kept for post-mortems.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreBreakdown {
    /// +100 when the candidate exits 0.
    pub exit_bonus: i64,
    /// +30 for the generator's primary fix.
    pub primary_bonus: i64,
    /// +20 per error line removed, -50 per error line added.
    pub error_delta: i64,
    /// -50 when the error kind changes, -100 when it changes to a cascading kind.
    pub kind_transition: i64,
    /// -10 per changed line beyond 3, +10 for at most 2.
    pub diff_size: i64,
    /// +15 when the candidate prints output and the baseline did not.
    pub output_bonus: i64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> i64 {
        self.exit_bonus
            + self.primary_bonus
            + self.error_delta
            + self.kind_transition
            + self.diff_size
            + self.output_bonus
    }
}

/// A candidate with its score and the run that produced it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoredPatch {
    pub candidate: PatchCandidate,
    pub score: i64,
    pub breakdown: ScoreBreakdown,
    pub result: SandboxResult,
}
