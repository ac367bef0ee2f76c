//! Structured observability hooks for the repair lifecycle.
//!
//! - Repair-scoped tracing spans via [`RepairSpan`]
//! - Emission functions for lifecycle events: start, iteration, candidate
//!   scoring, selection failure, finish
//!
//! Events are emitted at `info!` level, selection failures at `warn!`.

use tracing::{info, warn, Instrument};

use crate::domain::{CandidateScore, IterationStatus, RepairStatus};

/// RAII guard that enters a repair-scoped span.
///
/// For async code use [`RepairSpan::instrument`] instead: an entered span
/// must not be held across an `.await`.
///
/// ```ignore
/// let _span = RepairSpan::enter("main.py");
/// ```
pub struct RepairSpan {
    _span: tracing::span::EnteredSpan,
}

impl RepairSpan {
    pub fn span(label: &str) -> tracing::Span {
        tracing::info_span!("mender.repair", source = %label)
    }

    /// Create and enter a span tagged with the source label.
    pub fn enter(label: &str) -> Self {
        Self {
            _span: Self::span(label).entered(),
        }
    }

    /// Run `future` inside a span tagged with the source label.
    pub fn instrument<F: std::future::Future>(
        label: &str,
        future: F,
    ) -> tracing::instrument::Instrumented<F> {
        future.instrument(Self::span(label))
    }
}

/// Emit event: repair started.
pub fn emit_repair_started(label: &str, language: &str, max_iterations: u32) {
    info!(
        event = "repair.started",
        source = %label,
        language = %language,
        max_iterations = max_iterations,
    );
}

/// Emit event: one loop iteration finished.
pub fn emit_iteration_finished(index: u32, status: IterationStatus, patch_id: Option<&str>) {
    info!(
        event = "iteration.finished",
        index = index,
        status = ?status,
        patch_id = patch_id.unwrap_or("-"),
    );
}

/// Emit event: a candidate was executed and scored.
pub fn emit_candidate_scored(candidate_id: &str, score: i64, exit_code: i32) {
    info!(
        event = "candidate.scored",
        candidate_id = %candidate_id,
        score = score,
        exit_code = exit_code,
    );
}

/// Emit event: no candidate scored positively (warning level).
pub fn emit_selection_failed(scored: &[CandidateScore]) {
    let listed = scored
        .iter()
        .map(|c| format!("{}={}", c.id, c.score))
        .collect::<Vec<_>>()
        .join(", ");
    warn!(
        event = "selection.failed",
        candidates = scored.len(),
        scores = %listed,
    );
}

/// Emit event: repair finished.
pub fn emit_repair_finished(
    label: &str,
    status: RepairStatus,
    iterations: usize,
    duration_ms: u64,
) {
    info!(
        event = "repair.finished",
        source = %label,
        status = ?status,
        iterations = iterations,
        duration_ms = duration_ms,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repair_span_create() {
        let _span = RepairSpan::enter("main.py");
        emit_iteration_finished(1, IterationStatus::Retrying, Some("guard"));
        emit_selection_failed(&[CandidateScore {
            id: "a".to_string(),
            score: -10,
        }]);
    }

    #[tokio::test]
    async fn test_instrumented_future_runs() {
        let value = RepairSpan::instrument("main.py", async { 7 }).await;
        assert_eq!(value, 7);
    }
}
