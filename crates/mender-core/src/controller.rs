//! The bounded repair loop.
//!
//! Each iteration runs the current source, diagnoses it, asks the
//! registered generator for candidates, evaluates them empirically and
//! commits the best one. The loop ends in one of three terminal states,
//! and every one of them yields a [`RepairOutcome`] with the full history.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use mender_sandbox::{ExecStatus, Executor, Language, SandboxResult};
use tracing::{debug, warn};

use crate::analysis::{analyze_for, inspect_output};
use crate::config::RepairConfig;
use crate::domain::finding::top_priority;
use crate::domain::{
    source_fingerprint, AppliedPatch, ErrorRecord, FailureReason, IterationRecord,
    IterationStatus, PatchCandidate, RepairOutcome, RepairStatus, Result,
};
use crate::evaluate;
use crate::extract::extract;
use crate::generate::GeneratorRegistry;
use crate::metrics::METRICS;
use crate::obs::{self, RepairSpan};
use crate::persistence::{BackupSink, NullBackupSink};
use crate::test_cases;

/// Label used for sources that do not come from a file.
pub const DEFAULT_LABEL: &str = "source";

#[derive(Debug, Clone, PartialEq, Eq)]
enum LoopState {
    Running,
    Succeeded,
    Failed(FailureReason),
    Exhausted,
}

/// Drives one source from broken to verified-working, or to a recorded
/// failure.
///
/// The controller owns no per-repair state: every call to
/// [`RepairController::repair`] starts from scratch, so one controller can
/// serve any number of repairs.
pub struct RepairController {
    executor: Arc<dyn Executor>,
    generators: GeneratorRegistry,
    config: RepairConfig,
    backups: Arc<dyn BackupSink>,
}

impl RepairController {
    pub fn new(
        executor: Arc<dyn Executor>,
        generators: GeneratorRegistry,
        config: RepairConfig,
    ) -> Self {
        Self {
            executor,
            generators,
            config,
            backups: Arc::new(NullBackupSink),
        }
    }

    /// Send pre-patch sources to `sink` (builder pattern).
    pub fn with_backup_sink(mut self, sink: Arc<dyn BackupSink>) -> Self {
        self.backups = sink;
        self
    }

    pub fn config(&self) -> &RepairConfig {
        &self.config
    }

    pub fn generators(&self) -> &GeneratorRegistry {
        &self.generators
    }

    /// Repair an in-memory source.
    pub async fn repair(&self, source: &str, language: Language) -> RepairOutcome {
        self.repair_labeled(DEFAULT_LABEL, source, language).await
    }

    /// Repair an in-memory source, tagging logs and backups with `label`.
    pub async fn repair_labeled(
        &self,
        label: &str,
        source: &str,
        language: Language,
    ) -> RepairOutcome {
        RepairSpan::instrument(label, self.run_loop(label, source, language)).await
    }

    /// Read `path`, infer its language from the extension and repair it.
    ///
    /// The file itself is left untouched; the repaired text is in
    /// [`RepairOutcome::final_source`].
    pub async fn repair_file(&self, path: &Path) -> Result<RepairOutcome> {
        let language = Language::detect(path)?;
        let source = tokio::fs::read_to_string(path).await?;
        let label = path.to_string_lossy();
        Ok(self.repair_labeled(&label, &source, language).await)
    }

    async fn run_loop(&self, label: &str, original: &str, language: Language) -> RepairOutcome {
        let started = Instant::now();
        let max_iterations = self.config.max_iterations;
        obs::emit_repair_started(label, language.name(), max_iterations);

        let mut current = original.to_string();
        let mut iterations = Vec::new();
        let mut tried = HashSet::new();
        let mut state = LoopState::Running;

        for index in 1..=max_iterations {
            let (record, next) = self
                .iterate(index, label, &mut current, language, &mut tried)
                .await;
            obs::emit_iteration_finished(
                index,
                record.status,
                record.applied_patch.as_ref().map(|p| p.id.as_str()),
            );
            iterations.push(record);
            if next != LoopState::Running {
                state = next;
                break;
            }
        }
        if state == LoopState::Running {
            state = LoopState::Exhausted;
        }

        let (status, reason) = match state {
            LoopState::Succeeded => (RepairStatus::Success, None),
            LoopState::Failed(reason) => {
                debug!(reason = %reason.describe(), "repair failed");
                (RepairStatus::Failed, Some(reason))
            }
            LoopState::Running | LoopState::Exhausted => (
                RepairStatus::MaxIterationsReached,
                Some(FailureReason::BudgetExhausted { max_iterations }),
            ),
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        obs::emit_repair_finished(label, status, iterations.len(), duration_ms);
        METRICS.flush();

        RepairOutcome {
            success: status == RepairStatus::Success,
            final_source: current,
            iterations,
            status,
            reason,
        }
    }

    async fn iterate(
        &self,
        index: u32,
        label: &str,
        current: &mut String,
        language: Language,
        tried: &mut HashSet<String>,
    ) -> (IterationRecord, LoopState) {
        let limits = &self.config.limits;

        METRICS.inc_sandbox_runs();
        let run = match self.executor.run_source(current.as_str(), language, limits).await {
            Ok(run) if run.status == ExecStatus::SpawnFailed => {
                return failed(index, None, FailureReason::Environment { message: run.stderr });
            }
            Ok(run) => run,
            Err(e) => {
                return failed(
                    index,
                    None,
                    FailureReason::Environment {
                        message: e.to_string(),
                    },
                );
            }
        };
        if run.timed_out() {
            METRICS.inc_timeouts();
        }

        let diagnosis = if run.succeeded() {
            match self.logical_diagnosis(current.as_str(), language, &run).await {
                Ok(None) => {
                    let record = IterationRecord {
                        index,
                        diagnosis: None,
                        applied_patch: None,
                        status: IterationStatus::Fixed,
                    };
                    return (record, LoopState::Succeeded);
                }
                Ok(Some(diagnosis)) => diagnosis,
                Err(e) => {
                    return failed(
                        index,
                        None,
                        FailureReason::Environment {
                            message: e.to_string(),
                        },
                    );
                }
            }
        } else {
            let diagnosis = extract(&run, current.as_str());
            if !diagnosis.is_error() {
                return failed(
                    index,
                    None,
                    FailureReason::Undiagnosable {
                        exit_code: run.exit_code,
                    },
                );
            }
            diagnosis
        };
        debug!(
            iteration = index,
            kind = ?diagnosis.kind,
            line = ?diagnosis.line,
            "source diagnosed"
        );

        let candidates = self.candidates(language, &diagnosis, current.as_str(), tried);
        if candidates.is_empty() {
            let kind = diagnosis.kind.clone();
            return failed(index, Some(diagnosis), FailureReason::NoCandidates { kind });
        }
        tried.extend(candidates.iter().map(PatchCandidate::fingerprint));

        let selection = evaluate::select_against(
            self.executor.as_ref(),
            candidates,
            run,
            language,
            limits,
            self.config.max_parallel_evaluations,
        )
        .await;
        let best = match selection {
            Some(selection) if selection.best.score > 0 => selection.best,
            Some(selection) => {
                let scored = selection.scores();
                obs::emit_selection_failed(&scored);
                return failed(index, Some(diagnosis), FailureReason::NoSuitablePatch { scored });
            }
            None => {
                let kind = diagnosis.kind.clone();
                return failed(index, Some(diagnosis), FailureReason::NoCandidates { kind });
            }
        };

        self.back_up(label, current.as_str()).await;
        *current = best.candidate.patched_source.clone();
        METRICS.inc_patches_committed();

        let exited_zero = best.result.succeeded();
        let record = IterationRecord {
            index,
            diagnosis: Some(diagnosis),
            applied_patch: Some(AppliedPatch::from(&best)),
            status: if exited_zero {
                IterationStatus::Fixed
            } else {
                IterationStatus::Retrying
            },
        };
        if exited_zero {
            match self.logical_diagnosis(current.as_str(), language, &best.result).await {
                Ok(None) => return (record, LoopState::Succeeded),
                Ok(Some(remaining)) => {
                    debug!(kind = ?remaining.kind, "committed source still has findings");
                }
                Err(e) => {
                    debug!(error = %e, "clean check failed; continuing");
                }
            }
        }
        (record, LoopState::Running)
    }

    /// The top-priority logical finding of a run that exited 0, wrapped as a
    /// diagnosis. Test-case findings take precedence over static ones.
    /// Hand the pre-patch source to the sink on the blocking pool; sinks
    /// may do file I/O.
    async fn back_up(&self, label: &str, source: &str) {
        let sink = Arc::clone(&self.backups);
        let (owned_label, owned_source) = (label.to_string(), source.to_string());
        let task = tokio::task::spawn_blocking(move || sink.backup(&owned_label, &owned_source));
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(source = %label, error = %format!("{e:#}"), "backup failed"),
            Err(e) => warn!(source = %label, error = %e, "backup task failed"),
        }
    }

    async fn logical_diagnosis(
        &self,
        source: &str,
        language: Language,
        run: &SandboxResult,
    ) -> Result<Option<ErrorRecord>> {
        let mut findings = Vec::new();
        if self.config.enable_test_cases {
            findings = test_cases::diagnose(
                self.executor.as_ref(),
                language,
                source,
                &self.config.limits,
            )
            .await?;
        }
        if findings.is_empty() {
            findings.extend(inspect_output(&run.stdout));
            if self.config.enable_static_analysis {
                findings.extend(analyze_for(language, source));
            }
        }
        Ok(top_priority(&findings).map(|finding| ErrorRecord::from_finding(finding, source)))
    }

    /// Generated candidates after the rule filter, minus anything already
    /// tried, identical to `current`, or repeated within the batch.
    fn candidates(
        &self,
        language: Language,
        diagnosis: &ErrorRecord,
        current: &str,
        tried: &HashSet<String>,
    ) -> Vec<PatchCandidate> {
        let generated = self.generators.generate(
            language,
            diagnosis,
            current,
            self.config.allow_efficiency_variants,
        );
        let generated_count = generated.len();

        let current_fingerprint = source_fingerprint(current);
        let mut batch = HashSet::new();
        let mut kept: Vec<PatchCandidate> = self
            .config
            .rules
            .apply(generated)
            .into_iter()
            .filter(|candidate| {
                let fingerprint = candidate.fingerprint();
                fingerprint != current_fingerprint
                    && !tried.contains(&fingerprint)
                    && batch.insert(fingerprint)
            })
            .collect();
        kept.truncate(self.config.max_candidates);

        debug!(
            generated = generated_count,
            kept = kept.len(),
            "candidates filtered"
        );
        kept
    }
}

fn failed(
    index: u32,
    diagnosis: Option<ErrorRecord>,
    reason: FailureReason,
) -> (IterationRecord, LoopState) {
    let record = IterationRecord {
        index,
        diagnosis,
        applied_patch: None,
        status: IterationStatus::Failed,
    };
    (record, LoopState::Failed(reason))
}

impl std::fmt::Debug for RepairController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepairController")
            .field("generators", &self.generators)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
