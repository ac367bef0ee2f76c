//! Empirical patch evaluation and selection.
//!
//! Every candidate is executed; nothing about it is judged statically.
//! Scores are additive over the terms of [`ScoreBreakdown`], and ranking is
//! a stable sort, so equal scores keep declaration order.

use futures::stream::{self, StreamExt};
use mender_sandbox::{Executor, Language, ResourceLimits, SandboxResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{CandidateScore, PatchCandidate, Result, ScoreBreakdown, ScoredPatch};
use crate::extract::classify_stderr;
use crate::metrics::METRICS;
use crate::obs;

/// Fragments that make a stderr line count as error-like.
const ERROR_MARKERS: &[&str] = &["Error", "Exception", "Traceback", "Warning"];

/// Result of ranking a non-empty candidate list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Selection {
    /// The highest-scoring candidate (first declared among equals).
    pub best: ScoredPatch,
    /// Every candidate, best first.
    pub ranked: Vec<ScoredPatch>,
    /// The run of the unpatched source the scores are relative to.
    pub baseline: SandboxResult,
}

impl Selection {
    pub fn scores(&self) -> Vec<CandidateScore> {
        self.ranked
            .iter()
            .map(|s| CandidateScore {
                id: s.candidate.id.clone(),
                score: s.score,
            })
            .collect()
    }
}

/// Run `original` once as the baseline, then select among `candidates`.
/// `Ok(None)` only for an empty candidate list; `Err` when the baseline
/// itself cannot be run.
pub async fn select(
    executor: &dyn Executor,
    candidates: Vec<PatchCandidate>,
    original: &str,
    language: Language,
    limits: &ResourceLimits,
    max_parallel: usize,
) -> Result<Option<Selection>> {
    if candidates.is_empty() {
        return Ok(None);
    }
    METRICS.inc_sandbox_runs();
    let baseline = executor.run_source(original, language, limits).await?;
    Ok(select_against(executor, candidates, baseline, language, limits, max_parallel).await)
}

/// Select among `candidates` relative to an existing baseline run.
pub async fn select_against(
    executor: &dyn Executor,
    candidates: Vec<PatchCandidate>,
    baseline: SandboxResult,
    language: Language,
    limits: &ResourceLimits,
    max_parallel: usize,
) -> Option<Selection> {
    if candidates.is_empty() {
        return None;
    }

    let results: Vec<SandboxResult> = stream::iter(
        candidates
            .iter()
            .map(|candidate| run_candidate(executor, candidate, language, limits)),
    )
    .buffered(max_parallel.max(1))
    .collect()
    .await;

    let mut ranked: Vec<ScoredPatch> = candidates
        .into_iter()
        .zip(results)
        .map(|(candidate, result)| {
            let breakdown = score(&candidate, &result, &baseline);
            let total = breakdown.total();
            obs::emit_candidate_scored(&candidate.id, total, result.exit_code);
            ScoredPatch {
                candidate,
                score: total,
                breakdown,
                result,
            }
        })
        .collect();

    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    let best = ranked.first()?.clone();
    Some(Selection {
        best,
        ranked,
        baseline,
    })
}

async fn run_candidate(
    executor: &dyn Executor,
    candidate: &PatchCandidate,
    language: Language,
    limits: &ResourceLimits,
) -> SandboxResult {
    METRICS.inc_sandbox_runs();
    METRICS.inc_candidates_evaluated();
    let result = match executor
        .run_source(&candidate.patched_source, language, limits)
        .await
    {
        Ok(result) => result,
        // A sandbox fault scores like a failed run.
        Err(e) => SandboxResult::spawn_failed(language, Vec::new(), e.to_string()),
    };
    if result.timed_out() {
        METRICS.inc_timeouts();
    }
    debug!(
        candidate = %candidate.id,
        status = ?result.status,
        exit_code = result.exit_code,
        "candidate executed"
    );
    result
}

/// Error-like lines on stderr; stdout is never counted.
fn error_line_count(result: &SandboxResult) -> i64 {
    result
        .stderr
        .lines()
        .filter(|line| ERROR_MARKERS.iter().any(|m| line.contains(m)))
        .count() as i64
}

/// Score one candidate run against the baseline run.
pub fn score(
    candidate: &PatchCandidate,
    result: &SandboxResult,
    baseline: &SandboxResult,
) -> ScoreBreakdown {
    let exit_bonus = if result.succeeded() { 100 } else { 0 };
    let primary_bonus = if candidate.primary { 30 } else { 0 };

    let delta = error_line_count(baseline) - error_line_count(result);
    let error_delta = if delta >= 0 { 20 * delta } else { 50 * delta };

    let kind_transition = match (classify_stderr(&baseline.stderr), classify_stderr(&result.stderr)) {
        (Some(before), Some(after)) if before != after => {
            if after.is_cascading() {
                -100
            } else {
                -50
            }
        }
        _ => 0,
    };

    let changed = candidate.changed_lines() as i64;
    let diff_size = if changed > 3 {
        -10 * (changed - 3)
    } else if changed <= 2 {
        10
    } else {
        0
    };

    let output_bonus = if !result.stdout.trim().is_empty() && baseline.stdout.trim().is_empty() {
        15
    } else {
        0
    };

    ScoreBreakdown {
        exit_bonus,
        primary_bonus,
        error_delta,
        kind_transition,
        diff_size,
        output_bonus,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mender_sandbox::{ExecStatus, Timings};

    fn run(exit_code: i32, stdout: &str, stderr: &str) -> SandboxResult {
        SandboxResult {
            language: Language::Python,
            status: ExecStatus::Completed,
            exit_code,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            executed_command: vec!["python3".to_string(), "main.py".to_string()],
            timings: Timings::default(),
        }
    }

    const ORIGINAL: &str = "a = 1\nb = 0\nprint(a / b)\n";

    #[test]
    fn test_successful_small_fix_scores_high() {
        let candidate =
            PatchCandidate::new("guard", "guard", ORIGINAL, "a = 1\nb = 0\nprint(a / b if b else 0)\n")
                .primary();
        let baseline = run(
            1,
            "",
            "Traceback (most recent call last):\nZeroDivisionError: division by zero\n",
        );
        let breakdown = score(&candidate, &run(0, "0\n", ""), &baseline);
        assert_eq!(breakdown.exit_bonus, 100);
        assert_eq!(breakdown.primary_bonus, 30);
        assert_eq!(breakdown.error_delta, 40);
        assert_eq!(breakdown.kind_transition, 0);
        assert_eq!(breakdown.diff_size, 10);
        assert_eq!(breakdown.output_bonus, 15);
        assert_eq!(breakdown.total(), 195);
    }

    #[test]
    fn test_cascading_transition_is_doubled() {
        let candidate = PatchCandidate::new("x", "x", ORIGINAL, "a = 1\nb = 0\nprint(a / c)\n");
        let baseline = run(1, "", "ZeroDivisionError: division by zero\n");
        let broke = run(1, "", "NameError: name 'c' is not defined\n");
        assert_eq!(score(&candidate, &broke, &baseline).kind_transition, -100);

        let other = run(1, "", "TypeError: bad operand\n");
        assert_eq!(score(&candidate, &other, &baseline).kind_transition, -50);
    }

    #[test]
    fn test_more_error_lines_cost_fifty_each() {
        let candidate = PatchCandidate::new("x", "x", ORIGINAL, ORIGINAL.replace("b = 0", "b = 2"));
        let baseline = run(1, "", "ValueError: x\n");
        let worse = run(1, "", "Warning: a\nValueError: x\nValueError: y\n");
        assert_eq!(score(&candidate, &worse, &baseline).error_delta, -100);
    }

    #[test]
    fn test_error_words_on_stdout_are_not_error_lines() {
        let candidate = PatchCandidate::new("x", "x", ORIGINAL, ORIGINAL.replace("b = 0", "b = 2"));
        let baseline = run(1, "", "ValueError: x\n");
        let fixed = run(0, "No Errors found, Warning count 0\n", "");
        assert_eq!(score(&candidate, &fixed, &baseline).error_delta, 20);
    }

    #[test]
    fn test_large_diffs_are_penalized() {
        let patched = "x = 1\ny = 2\nz = 3\nw = 4\nprint(x)\n";
        let candidate = PatchCandidate::new("big", "rewrite", ORIGINAL, patched);
        let changed = candidate.changed_lines() as i64;
        assert!(changed > 3);
        let breakdown = score(&candidate, &run(0, "1\n", ""), &run(0, "1\n", ""));
        assert_eq!(breakdown.diff_size, -10 * (changed - 3));
        assert_eq!(breakdown.output_bonus, 0);
    }

    #[test]
    fn test_timed_out_candidate_gets_no_exit_bonus() {
        let candidate = PatchCandidate::new("loop", "loop", ORIGINAL, "while True:\n    pass\n");
        let mut timed_out = run(124, "", "");
        timed_out.status = ExecStatus::TimedOut;
        assert_eq!(score(&candidate, &timed_out, &run(1, "", "")).exit_bonus, 0);
    }
}
