//! Repair loop behaviour against a scripted executor.
//!
//! The executor maps each source text to a canned [`SandboxResult`], so
//! these tests exercise the controller and the evaluator without spawning
//! processes. The tests at the end run the real sandbox; the Python ones
//! skip themselves when `python3` is missing.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mender_core::evaluate;
use mender_core::{
    BackupSink, ErrorKind, ErrorRecord, ExecStatus, Executor, FailureReason, FindingCategory,
    FsBackupSink, GeneratorRegistry, IterationStatus, Language, MemoryBackupSink, PatchCandidate,
    RepairConfig, RepairController, RepairStatus, ResourceLimits, RuleFilter, SandboxEngine,
    SandboxResult,
};
use mender_sandbox::{SandboxError, Timings};

type Respond = dyn Fn(&str) -> SandboxResult + Send + Sync;

/// Answers every run through a closure and records what it was asked to run.
struct ScriptedExecutor {
    respond: Box<Respond>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    fn new(respond: impl Fn(&str) -> SandboxResult + Send + Sync + 'static) -> Self {
        Self {
            respond: Box::new(respond),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Executor for ScriptedExecutor {
    async fn run_source(
        &self,
        source: &str,
        _language: Language,
        _limits: &ResourceLimits,
    ) -> mender_sandbox::Result<SandboxResult> {
        self.calls.lock().unwrap().push(source.to_string());
        Ok((self.respond)(source))
    }
}

struct FaultyExecutor;

#[async_trait]
impl Executor for FaultyExecutor {
    async fn run_source(
        &self,
        _source: &str,
        language: Language,
        _limits: &ResourceLimits,
    ) -> mender_sandbox::Result<SandboxResult> {
        Err(SandboxError::UnsupportedLanguage(language))
    }
}

fn completed(exit_code: i32, stdout: &str, stderr: &str) -> SandboxResult {
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

fn ok(stdout: &str) -> SandboxResult {
    completed(0, stdout, "")
}

fn traceback(line: u32, code: &str, error: &str) -> SandboxResult {
    completed(
        1,
        "",
        &format!(
            "Traceback (most recent call last):\n  File \"/tmp/mender-abc/main.py\", line {line}, in <module>\n    {code}\n{error}\n"
        ),
    )
}

const BROKEN: &str = "a = 10\nb = 0\nprint(a / b)\n";
const GUARDED: &str = "a = 10\nb = 0\nprint(a / b if b != 0 else 0)\n";
const REWRITE: &str = "a = 10\nb = 1\nprint(a / b)\n";

fn divide_script(source: &str) -> SandboxResult {
    match source {
        BROKEN => traceback(3, "print(a / b)", "ZeroDivisionError: division by zero"),
        GUARDED => ok("0\n"),
        REWRITE => ok("10.0\n"),
        _ => completed(1, "", "ValueError: unexpected source\n"),
    }
}

fn divide_generator(diagnosis: &ErrorRecord, source: &str, _: bool) -> Vec<PatchCandidate> {
    if diagnosis.kind != Some(ErrorKind::DivideByZero) {
        return Vec::new();
    }
    vec![
        PatchCandidate::new("guard-divisor", "guard the divisor", source, GUARDED).primary(),
        PatchCandidate::new("rewrite", "use a non-zero divisor", source, REWRITE),
    ]
}

fn registry(
    generator: impl Fn(&ErrorRecord, &str, bool) -> Vec<PatchCandidate> + Send + Sync + 'static,
) -> GeneratorRegistry {
    GeneratorRegistry::new().with_generator(Language::Python, Arc::new(generator))
}

fn controller(executor: Arc<ScriptedExecutor>, generators: GeneratorRegistry) -> RepairController {
    RepairController::new(executor, generators, RepairConfig::default())
}

// ── Terminal states ─────────────────────────────────────────────────────

#[tokio::test]
async fn clean_source_succeeds_after_one_iteration() {
    let executor = Arc::new(ScriptedExecutor::new(|_| ok("ok\n")));
    let source = "print('ok')\n";
    let outcome = controller(executor.clone(), GeneratorRegistry::new())
        .repair(source, Language::Python)
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.status, RepairStatus::Success);
    assert_eq!(outcome.final_source, source);
    assert_eq!(outcome.iterations.len(), 1);
    assert_eq!(outcome.iterations[0].status, IterationStatus::Fixed);
    assert!(outcome.iterations[0].diagnosis.is_none());
    assert!(outcome.reason.is_none());
    assert_eq!(executor.calls(), vec![source.to_string()]);
}

#[tokio::test]
async fn zero_budget_executes_nothing() {
    let executor = Arc::new(ScriptedExecutor::new(divide_script));
    let config = RepairConfig::default().with_max_iterations(0);
    let outcome = RepairController::new(executor.clone(), registry(divide_generator), config)
        .repair(BROKEN, Language::Python)
        .await;

    assert_eq!(outcome.status, RepairStatus::MaxIterationsReached);
    assert!(outcome.iterations.is_empty());
    assert_eq!(outcome.final_source, BROKEN);
    assert!(executor.calls().is_empty());
}

#[tokio::test]
async fn divide_by_zero_is_repaired_in_one_iteration() {
    let executor = Arc::new(ScriptedExecutor::new(divide_script));
    let outcome = controller(executor.clone(), registry(divide_generator))
        .repair(BROKEN, Language::Python)
        .await;

    assert_eq!(outcome.status, RepairStatus::Success);
    assert_eq!(outcome.final_source, GUARDED);
    assert_eq!(outcome.iterations.len(), 1);

    let record = &outcome.iterations[0];
    assert_eq!(record.status, IterationStatus::Fixed);
    let diagnosis = record.diagnosis.as_ref().unwrap();
    assert_eq!(diagnosis.kind, Some(ErrorKind::DivideByZero));
    assert_eq!(diagnosis.line, Some(3));
    assert_eq!(diagnosis.snippet.as_deref(), Some("print(a / b)"));

    let applied = record.applied_patch.as_ref().unwrap();
    assert_eq!(applied.id, "guard-divisor");
    assert!(applied.score >= 100);

    // The baseline, then one run per candidate; the clean check reuses the
    // winner's run.
    assert_eq!(executor.calls().len(), 3);
}

#[tokio::test]
async fn repair_is_deterministic() {
    let run = || async {
        let executor = Arc::new(ScriptedExecutor::new(divide_script));
        controller(executor, registry(divide_generator))
            .repair(BROKEN, Language::Python)
            .await
    };
    let first = run().await;
    let second = run().await;
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[tokio::test]
async fn missing_generator_fails_with_no_candidates() {
    let executor = Arc::new(ScriptedExecutor::new(divide_script));
    let outcome = controller(executor, GeneratorRegistry::new())
        .repair(BROKEN, Language::Python)
        .await;

    assert_eq!(outcome.status, RepairStatus::Failed);
    assert_eq!(
        outcome.reason,
        Some(FailureReason::NoCandidates {
            kind: Some(ErrorKind::DivideByZero)
        })
    );
    assert_eq!(outcome.iterations.len(), 1);
    assert_eq!(outcome.iterations[0].status, IterationStatus::Failed);
    assert!(outcome.iterations[0].diagnosis.is_some());
    assert_eq!(outcome.final_source, BROKEN);
}

#[tokio::test]
async fn silent_failure_is_undiagnosable() {
    let executor = Arc::new(ScriptedExecutor::new(|_| completed(1, "", "")));
    let outcome = controller(executor, registry(divide_generator))
        .repair("import sys\nsys.exit(1)\n", Language::Python)
        .await;

    assert_eq!(outcome.status, RepairStatus::Failed);
    assert_eq!(
        outcome.reason,
        Some(FailureReason::Undiagnosable { exit_code: 1 })
    );
    assert!(outcome.iterations[0].diagnosis.is_none());
}

#[tokio::test]
async fn spawn_failure_is_an_environment_failure() {
    let executor = Arc::new(ScriptedExecutor::new(|_| {
        SandboxResult::spawn_failed(
            Language::Python,
            vec!["python3".to_string()],
            "python3: not found",
        )
    }));
    let outcome = controller(executor, registry(divide_generator))
        .repair(BROKEN, Language::Python)
        .await;

    assert_eq!(outcome.status, RepairStatus::Failed);
    assert_eq!(
        outcome.reason,
        Some(FailureReason::Environment {
            message: "python3: not found".to_string()
        })
    );
}

#[tokio::test]
async fn executor_fault_is_an_environment_failure() {
    let outcome = RepairController::new(
        Arc::new(FaultyExecutor),
        registry(divide_generator),
        RepairConfig::default(),
    )
    .repair(BROKEN, Language::Python)
    .await;

    assert_eq!(outcome.status, RepairStatus::Failed);
    match outcome.reason {
        Some(FailureReason::Environment { message }) => assert!(message.contains("python")),
        other => panic!("expected environment failure, got {other:?}"),
    }
}

#[tokio::test]
async fn cascading_candidate_is_rejected() {
    let broken_further = "a = 10\nb = 0\nprint(a / c)\n";
    let executor = Arc::new(ScriptedExecutor::new(move |source| {
        if source == broken_further {
            traceback(3, "print(a / c)", "NameError: name 'c' is not defined")
        } else {
            divide_script(source)
        }
    }));
    let generator = move |_: &ErrorRecord, source: &str, _: bool| {
        vec![PatchCandidate::new("rename", "rename divisor", source, broken_further)]
    };
    let outcome = controller(executor, registry(generator))
        .repair(BROKEN, Language::Python)
        .await;

    assert_eq!(outcome.status, RepairStatus::Failed);
    match outcome.reason {
        Some(FailureReason::NoSuitablePatch { scored }) => {
            assert_eq!(scored.len(), 1);
            assert_eq!(scored[0].id, "rename");
            assert!(scored[0].score <= 0);
        }
        other => panic!("expected no suitable patch, got {other:?}"),
    }
    assert_eq!(outcome.final_source, BROKEN);
    assert!(outcome.iterations[0].applied_patch.is_none());
}

#[tokio::test]
async fn budget_runs_out_while_still_improving() {
    // Every prepended marker removes one warning line, but the source never
    // stops failing.
    let executor = Arc::new(ScriptedExecutor::new(|source| {
        let tries = source.lines().filter(|l| *l == "# try").count();
        let warnings = "Warning: noisy\n".repeat(3usize.saturating_sub(tries));
        completed(1, "", &format!("{warnings}ValueError: bad input\n"))
    }));
    let generator = |_: &ErrorRecord, source: &str, _: bool| {
        vec![PatchCandidate::new("mark", "add marker", source, format!("# try\n{source}"))]
    };
    let config = RepairConfig::default().with_max_iterations(3);
    let outcome = RepairController::new(executor, registry(generator), config)
        .repair("raise ValueError('bad input')\n", Language::Python)
        .await;

    assert_eq!(outcome.status, RepairStatus::MaxIterationsReached);
    assert_eq!(
        outcome.reason,
        Some(FailureReason::BudgetExhausted { max_iterations: 3 })
    );
    assert_eq!(outcome.iterations.len(), 3);
    assert!(outcome
        .iterations
        .iter()
        .all(|it| it.status == IterationStatus::Retrying));
    assert_eq!(outcome.applied_patch_ids(), vec!["mark", "mark", "mark"]);
    assert_eq!(outcome.final_source.matches("# try\n").count(), 3);
}

// ── Candidate handling ──────────────────────────────────────────────────

#[tokio::test]
async fn rule_filter_removes_denied_candidates() {
    let executor = Arc::new(ScriptedExecutor::new(divide_script));
    let config = RepairConfig::default().with_rules(RuleFilter::default().denying("guard-divisor"));
    let outcome = RepairController::new(executor.clone(), registry(divide_generator), config)
        .repair(BROKEN, Language::Python)
        .await;

    assert_eq!(outcome.status, RepairStatus::Success);
    assert_eq!(outcome.applied_patch_ids(), vec!["rewrite"]);
    assert_eq!(outcome.final_source, REWRITE);
    assert!(!executor.calls().iter().any(|s| s == GUARDED));
}

#[tokio::test]
async fn candidates_are_never_retried() {
    // "partial" improves the failure without fixing it; the generator keeps
    // offering the same two candidates.
    let partial = "a = 10\nb = 0\nprint(a // b)\n";
    let stuck = "a = 10\nb = 0\nprint(a % b)\n";
    let executor = Arc::new(ScriptedExecutor::new(move |source| {
        if source == partial || source == stuck {
            completed(1, "", "ZeroDivisionError: integer division or modulo by zero\n")
        } else {
            divide_script(source)
        }
    }));
    let generator = move |_: &ErrorRecord, source: &str, _: bool| {
        vec![
            PatchCandidate::new("floor", "floor division", source, partial),
            PatchCandidate::new("modulo", "modulo", source, stuck),
        ]
    };
    let outcome = controller(executor.clone(), registry(generator))
        .repair(BROKEN, Language::Python)
        .await;

    assert_eq!(outcome.status, RepairStatus::Failed);
    assert_eq!(outcome.iterations.len(), 2);
    assert_eq!(outcome.iterations[0].status, IterationStatus::Retrying);
    assert_eq!(outcome.applied_patch_ids(), vec!["floor"]);
    assert!(matches!(
        outcome.reason,
        Some(FailureReason::NoCandidates { .. })
    ));
    assert_eq!(executor.calls().iter().filter(|s| *s == stuck).count(), 1);
}

#[tokio::test]
async fn backups_receive_every_pre_patch_source() {
    let executor = Arc::new(ScriptedExecutor::new(divide_script));
    let sink = Arc::new(MemoryBackupSink::new());
    let outcome = controller(executor, registry(divide_generator))
        .with_backup_sink(sink.clone())
        .repair_labeled("main.py", BROKEN, Language::Python)
        .await;

    assert!(outcome.success);
    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].label, "main.py");
    assert_eq!(records[0].source, BROKEN);
}

/// Blocks inside `backup` until a task on the test runtime answers.
struct HandshakeSink {
    entered: Arc<tokio::sync::Notify>,
    release: Mutex<std::sync::mpsc::Receiver<()>>,
    answered: Mutex<bool>,
}

impl BackupSink for HandshakeSink {
    fn backup(&self, _label: &str, _source: &str) -> anyhow::Result<()> {
        self.entered.notify_one();
        let release = self.release.lock().unwrap();
        let answered = release
            .recv_timeout(std::time::Duration::from_secs(5))
            .is_ok();
        *self.answered.lock().unwrap() = answered;
        Ok(())
    }
}

#[tokio::test]
async fn blocking_backup_sink_does_not_stall_the_runtime() {
    let (tx, rx) = std::sync::mpsc::channel();
    let entered = Arc::new(tokio::sync::Notify::new());
    let sink = Arc::new(HandshakeSink {
        entered: entered.clone(),
        release: Mutex::new(rx),
        answered: Mutex::new(false),
    });
    let responder = tokio::spawn(async move {
        entered.notified().await;
        let _ = tx.send(());
    });

    let executor = Arc::new(ScriptedExecutor::new(divide_script));
    let outcome = controller(executor, registry(divide_generator))
        .with_backup_sink(sink.clone())
        .repair(BROKEN, Language::Python)
        .await;
    responder.await.unwrap();

    assert!(outcome.success);
    assert!(*sink.answered.lock().unwrap());
}

#[tokio::test]
async fn repair_file_detects_language_and_backs_up() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("main.py");
    std::fs::write(&path, BROKEN).unwrap();

    let executor = Arc::new(ScriptedExecutor::new(divide_script));
    let outcome = controller(executor, registry(divide_generator))
        .with_backup_sink(Arc::new(FsBackupSink::new()))
        .repair_file(&path)
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.final_source, GUARDED);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), BROKEN);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("main.py.backup")).unwrap(),
        BROKEN
    );

    let unknown = dir.path().join("notes.txt");
    std::fs::write(&unknown, "hello").unwrap();
    let executor = Arc::new(ScriptedExecutor::new(divide_script));
    assert!(controller(executor, GeneratorRegistry::new())
        .repair_file(&unknown)
        .await
        .is_err());
}

// ── Logical diagnoses ───────────────────────────────────────────────────

#[tokio::test]
async fn static_finding_becomes_the_diagnosis() {
    let source = "def f():\n    return 1\n    print('never')\n\nprint(f())\n";
    let executor = Arc::new(ScriptedExecutor::new(|_| ok("1\n")));
    let outcome = controller(executor, GeneratorRegistry::new())
        .repair(source, Language::Python)
        .await;

    assert_eq!(outcome.status, RepairStatus::Failed);
    let diagnosis = outcome.iterations[0].diagnosis.as_ref().unwrap();
    assert_eq!(
        diagnosis.kind,
        Some(ErrorKind::Logical {
            category: FindingCategory::UnreachableCode
        })
    );
    assert_eq!(diagnosis.line, Some(3));
}

#[tokio::test]
async fn static_analysis_can_be_disabled() {
    let source = "def f():\n    return 1\n    print('never')\n\nprint(f())\n";
    let executor = Arc::new(ScriptedExecutor::new(|_| ok("1\n")));
    let config = RepairConfig {
        enable_static_analysis: false,
        ..RepairConfig::default()
    };
    let outcome = RepairController::new(executor, GeneratorRegistry::new(), config)
        .repair(source, Language::Python)
        .await;
    assert_eq!(outcome.status, RepairStatus::Success);
}

#[tokio::test]
async fn failing_test_case_drives_the_repair() {
    let source = "# TEST: adds one\n# INPUT: 5\n# EXPECTED: 6\ndef solve(n):\n    return n\n";
    let fixed = source.replace("return n\n", "return n + 1\n");

    let executor = Arc::new(ScriptedExecutor::new(|program| {
        if !program.contains("__mender") {
            return ok("");
        }
        if program.contains("return n + 1") {
            ok("__RESULT__: 6\n")
        } else {
            ok("__RESULT__: 5\n")
        }
    }));
    let fix = fixed.clone();
    let generator = move |diagnosis: &ErrorRecord, source: &str, _: bool| match diagnosis.kind {
        Some(ErrorKind::Logical {
            category: FindingCategory::OffByOne,
        }) => vec![PatchCandidate::new("add-one", "add one", source, fix.clone()).primary()],
        _ => Vec::new(),
    };
    let outcome = controller(executor, registry(generator))
        .repair(source, Language::Python)
        .await;

    assert_eq!(outcome.status, RepairStatus::Success);
    assert_eq!(outcome.final_source, fixed);
    assert_eq!(outcome.iterations.len(), 1);
    let diagnosis = outcome.iterations[0].diagnosis.as_ref().unwrap();
    assert_eq!(
        diagnosis.kind,
        Some(ErrorKind::Logical {
            category: FindingCategory::OffByOne
        })
    );
    assert!(diagnosis.message.as_deref().unwrap().contains("adds one"));
}

// ── Selection ───────────────────────────────────────────────────────────

#[tokio::test]
async fn exit_zero_candidate_wins_regardless_of_order() {
    let still_broken = "a = 10\nb = 0\nprint(a / b)  # checked\n";
    let executor = ScriptedExecutor::new(move |source| {
        if source == still_broken {
            traceback(3, "print(a / b)  # checked", "ZeroDivisionError: division by zero")
        } else {
            divide_script(source)
        }
    });
    let good = PatchCandidate::new("good", "guard", BROKEN, GUARDED);
    let bad = PatchCandidate::new("bad", "comment", BROKEN, still_broken).primary();
    let limits = ResourceLimits::default();

    for order in [vec![bad.clone(), good.clone()], vec![good.clone(), bad.clone()]] {
        let selection = evaluate::select(&executor, order, BROKEN, Language::Python, &limits, 2)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(selection.best.candidate.id, "good");
        assert!(selection.best.score >= 100);
        assert_eq!(selection.ranked.len(), 2);
        assert_eq!(selection.baseline.exit_code, 1);
    }
}

#[tokio::test]
async fn ties_keep_declaration_order() {
    let executor = ScriptedExecutor::new(|_| ok("same\n"));
    let first = PatchCandidate::new("first", "x", "print(1)\n", "print(2)\n");
    let second = PatchCandidate::new("second", "y", "print(1)\n", "print(3)\n");
    let limits = ResourceLimits::default();

    let selection = evaluate::select(
        &executor,
        vec![first, second],
        "print(1)\n",
        Language::Python,
        &limits,
        4,
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(selection.ranked[0].score, selection.ranked[1].score);
    assert_eq!(selection.best.candidate.id, "first");
    assert_eq!(
        selection
            .scores()
            .iter()
            .map(|s| s.id.as_str())
            .collect::<Vec<_>>(),
        vec!["first", "second"]
    );
}

#[tokio::test]
async fn empty_candidate_list_selects_nothing() {
    let executor = ScriptedExecutor::new(divide_script);
    let selection = evaluate::select(
        &executor,
        Vec::new(),
        BROKEN,
        Language::Python,
        &ResourceLimits::default(),
        4,
    )
    .await
    .unwrap();
    assert!(selection.is_none());
    assert!(executor.calls().is_empty());
}

// ── Real sandbox ────────────────────────────────────────────────────────

fn have(binary: &str) -> bool {
    std::env::var_os("PATH")
        .map(|path| std::env::split_paths(&path).any(|dir| dir.join(binary).is_file()))
        .unwrap_or(false)
}

#[tokio::test]
async fn end_to_end_divide_by_zero_with_python() {
    if !have("python3") {
        eprintln!("python3 not installed; skipping");
        return;
    }
    let engine = SandboxEngine::default();
    let limits = ResourceLimits::default();

    let baseline = engine.run_source(BROKEN, Language::Python, &limits).await.unwrap();
    assert_ne!(baseline.exit_code, 0);
    let diagnosis = mender_core::extract(&baseline, BROKEN);
    assert_eq!(diagnosis.kind, Some(ErrorKind::DivideByZero));
    assert_eq!(diagnosis.line, Some(3));

    let candidates = divide_generator(&diagnosis, BROKEN, false);
    let selection = evaluate::select(&engine, candidates, BROKEN, Language::Python, &limits, 2)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(selection.best.candidate.id, "guard-divisor");
    assert!(selection.best.score >= 100);

    let outcome = RepairController::new(
        Arc::new(SandboxEngine::default()),
        registry(divide_generator),
        RepairConfig::default(),
    )
    .repair(BROKEN, Language::Python)
    .await;
    assert_eq!(outcome.status, RepairStatus::Success);
    assert_eq!(outcome.iterations.len(), 1);
    assert_eq!(outcome.final_source, GUARDED);
}

#[tokio::test]
async fn correct_python_programs_stay_clean() {
    if !have("python3") {
        eprintln!("python3 not installed; skipping");
        return;
    }
    let sources = [
        "def value():\n    try:\n        return 5\n    finally:\n        print('done')\n\nprint(value())\n",
        "from __future__ import annotations\n\n# TEST: inc\n# INPUT: 5\n# EXPECTED: 6\ndef main(x: int) -> int:\n    return x + 1\n\nif __name__ == '__main__':\n    print(main(1))\n",
    ];
    for source in sources {
        let outcome = RepairController::new(
            Arc::new(SandboxEngine::default()),
            GeneratorRegistry::new(),
            RepairConfig::default(),
        )
        .repair(source, Language::Python)
        .await;
        assert_eq!(outcome.status, RepairStatus::Success, "{source}");
        assert_eq!(outcome.final_source, source);
        assert!(outcome.iterations[0].diagnosis.is_none(), "{source}");
    }
}

#[tokio::test]
async fn hanging_candidate_scores_failed_without_blocking_siblings() {
    let engine = SandboxEngine::default();
    let limits = ResourceLimits::new(1, 256);
    let original = "echo broken >&2\nexit 1\n";
    let candidates = vec![
        PatchCandidate::new("spin", "loop forever", original, "while :; do :; done\n"),
        PatchCandidate::new("fix", "print and exit", original, "echo fixed\n"),
    ];

    let started = std::time::Instant::now();
    let selection = evaluate::select(&engine, candidates, original, Language::Shell, &limits, 2)
        .await
        .unwrap()
        .unwrap();
    assert!(started.elapsed() < std::time::Duration::from_secs(10));

    assert_eq!(selection.best.candidate.id, "fix");
    let spin = selection
        .ranked
        .iter()
        .find(|s| s.candidate.id == "spin")
        .unwrap();
    assert_eq!(spin.result.status, ExecStatus::TimedOut);
    assert_eq!(spin.breakdown.exit_bonus, 0);
}
