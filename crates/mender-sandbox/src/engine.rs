//! The sandbox execution engine.
//!
//! Each call writes the source into a fresh temporary directory, runs the
//! toolchain's optional compile step and then its run step, both confined
//! by [`crate::limits`], and discards the directory afterwards.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{Result, SandboxError};
use crate::language::Language;
use crate::limits::{self, Confinement, ResourceLimits};
use crate::result::{ExecStatus, SandboxResult, Timings, TIMEOUT_EXIT_CODE};
use crate::toolchain::ToolchainTable;

/// Per-stream capture ceiling. Output beyond it is drained and dropped.
pub const MAX_CAPTURE_BYTES: u64 = 1024 * 1024;

/// stderr fragments that signal an allocation failure under the ceiling.
const MEMORY_MARKERS: &[&str] = &[
    "MemoryError",
    "std::bad_alloc",
    "Cannot allocate memory",
    "OutOfMemoryError",
    "out of memory",
    "JavaScript heap out of memory",
];

/// Anything that can run a source text and report a [`SandboxResult`].
///
/// `Err` is reserved for faults of the sandbox itself (unsupported
/// language, I/O on the working directory). Program failures, timeouts and
/// spawn failures are reported through [`ExecStatus`].
#[async_trait]
pub trait Executor: Send + Sync {
    async fn run_source(
        &self,
        source: &str,
        language: Language,
        limits: &ResourceLimits,
    ) -> Result<SandboxResult>;
}

/// Process-based executor parameterized over a [`ToolchainTable`].
#[derive(Debug, Clone, Default)]
pub struct SandboxEngine {
    toolchains: ToolchainTable,
}

impl SandboxEngine {
    pub fn new(toolchains: ToolchainTable) -> Self {
        Self { toolchains }
    }

    pub fn toolchains(&self) -> &ToolchainTable {
        &self.toolchains
    }

    /// Run the file at `source_path`.
    pub async fn execute(
        &self,
        source_path: &Path,
        language: Language,
        timeout_secs: u64,
        memory_limit_mb: u64,
    ) -> Result<SandboxResult> {
        let source = tokio::fs::read_to_string(source_path).await?;
        let limits = ResourceLimits::new(timeout_secs, memory_limit_mb);
        self.run_source(&source, language, &limits).await
    }
}

#[async_trait]
impl Executor for SandboxEngine {
    async fn run_source(
        &self,
        source: &str,
        language: Language,
        limits: &ResourceLimits,
    ) -> Result<SandboxResult> {
        limits.validate()?;
        let toolchain = self
            .toolchains
            .get(language)
            .ok_or(SandboxError::UnsupportedLanguage(language))?;

        let workdir = tempfile::Builder::new().prefix("mender-").tempdir()?;
        let stem = toolchain.source_stem(source);
        let file_name = toolchain.source_file_name(source);
        tokio::fs::write(workdir.path().join(&file_name), source).await?;

        let mut timings = Timings::default();

        if let Some(compile) = toolchain.compile_command(&file_name, &stem) {
            let confinement = Confinement {
                cpu_secs: limits.compile_timeout_secs + 1,
                address_space_bytes: None,
            };
            let step = run_step(
                &compile,
                workdir.path(),
                Duration::from_secs(limits.compile_timeout_secs),
                confinement,
            )
            .await;
            timings.compile_ms = Some(step.duration_ms);

            match step.end {
                StepEnd::SpawnFailed(reason) => {
                    warn!(language = %language, command = ?compile, "compile step failed to spawn");
                    let mut result = SandboxResult::spawn_failed(language, compile, reason);
                    result.timings = timings;
                    return Ok(result);
                }
                StepEnd::TimedOut => {
                    return Ok(SandboxResult {
                        language,
                        status: ExecStatus::TimedOut,
                        exit_code: TIMEOUT_EXIT_CODE,
                        stdout: step.stdout,
                        stderr: format!(
                            "compilation timed out after {}s",
                            limits.compile_timeout_secs
                        ),
                        executed_command: compile,
                        timings,
                    });
                }
                StepEnd::Exited(status) => {
                    let exit_code = exit_code_of(status);
                    if exit_code != 0 {
                        debug!(language = %language, exit_code, "compile step failed");
                        // Some compilers report on stdout.
                        let stderr = if step.stderr.trim().is_empty() {
                            step.stdout.clone()
                        } else {
                            step.stderr
                        };
                        return Ok(SandboxResult {
                            language,
                            status: ExecStatus::CompileFailed,
                            exit_code,
                            stdout: step.stdout,
                            stderr,
                            executed_command: compile,
                            timings,
                        });
                    }
                }
            }
        }

        let run = toolchain.run_command(&file_name, &stem);
        let confinement = Confinement {
            cpu_secs: limits.timeout_secs + 1,
            address_space_bytes: toolchain
                .enforce_address_space
                .then(|| limits.memory_limit_bytes()),
        };
        let step = run_step(
            &run,
            workdir.path(),
            Duration::from_secs(limits.timeout_secs),
            confinement,
        )
        .await;
        timings.run_ms = Some(step.duration_ms);

        let result = match step.end {
            StepEnd::SpawnFailed(reason) => {
                warn!(language = %language, command = ?run, "run step failed to spawn");
                let mut result = SandboxResult::spawn_failed(language, run, reason);
                result.timings = timings;
                result
            }
            StepEnd::TimedOut => SandboxResult {
                language,
                status: ExecStatus::TimedOut,
                exit_code: TIMEOUT_EXIT_CODE,
                stdout: step.stdout,
                stderr: format!("execution timed out after {}s", limits.timeout_secs),
                executed_command: run,
                timings,
            },
            StepEnd::Exited(status) => {
                let exit_code = exit_code_of(status);
                let (status, exit_code, stderr) = if killed_by_cpu_limit(status) {
                    (
                        ExecStatus::TimedOut,
                        TIMEOUT_EXIT_CODE,
                        format!("{}cpu time limit exceeded", with_newline(&step.stderr)),
                    )
                } else if exit_code != 0 && hit_memory_ceiling(&step.stderr) {
                    (ExecStatus::MemoryExceeded, exit_code, step.stderr)
                } else {
                    (ExecStatus::Completed, exit_code, step.stderr)
                };
                SandboxResult {
                    language,
                    status,
                    exit_code,
                    stdout: step.stdout,
                    stderr,
                    executed_command: run,
                    timings,
                }
            }
        };

        debug!(
            language = %language,
            status = ?result.status,
            exit_code = result.exit_code,
            duration_ms = result.timings.total_ms(),
            "sandbox run finished"
        );
        Ok(result)
    }
}

enum StepEnd {
    Exited(ExitStatus),
    TimedOut,
    SpawnFailed(String),
}

struct StepOutput {
    end: StepEnd,
    stdout: String,
    stderr: String,
    duration_ms: u64,
}

async fn run_step(
    argv: &[String],
    workdir: &Path,
    wall_clock: Duration,
    confinement: Confinement,
) -> StepOutput {
    let start = Instant::now();
    let elapsed = |start: Instant| start.elapsed().as_millis() as u64;

    let Some((program, args)) = argv.split_first() else {
        return StepOutput {
            end: StepEnd::SpawnFailed("empty command".to_string()),
            stdout: String::new(),
            stderr: String::new(),
            duration_ms: 0,
        };
    };

    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .env_clear();
    for key in ["PATH", "LANG", "LC_ALL"] {
        if let Some(value) = std::env::var_os(key) {
            cmd.env(key, value);
        }
    }
    cmd.env("HOME", workdir)
        .env("TMPDIR", workdir)
        .env("GOCACHE", workdir.join(".gocache"))
        .env("GOPATH", workdir.join(".gopath"))
        .env("PYTHONDONTWRITEBYTECODE", "1");
    limits::confine(&mut cmd, confinement);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => {
            return StepOutput {
                end: StepEnd::SpawnFailed(format!("failed to spawn {program}: {err}")),
                stdout: String::new(),
                stderr: String::new(),
                duration_ms: elapsed(start),
            }
        }
    };
    let pid = child.id();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let waited = tokio::time::timeout(wall_clock, async {
        tokio::join!(child.wait(), read_capped(stdout), read_capped(stderr))
    })
    .await;

    match waited {
        Ok((Ok(status), out, err)) => StepOutput {
            end: StepEnd::Exited(status),
            stdout: out,
            stderr: err,
            duration_ms: elapsed(start),
        },
        Ok((Err(err), out, _)) => StepOutput {
            end: StepEnd::SpawnFailed(format!("failed to wait for {program}: {err}")),
            stdout: out,
            stderr: String::new(),
            duration_ms: elapsed(start),
        },
        Err(_) => {
            if let Some(pid) = pid {
                limits::kill_group(pid);
            }
            let _ = child.start_kill();
            let _ = child.wait().await;
            StepOutput {
                end: StepEnd::TimedOut,
                stdout: String::new(),
                stderr: String::new(),
                duration_ms: elapsed(start),
            }
        }
    }
}

async fn read_capped<R: AsyncRead + Unpin>(reader: Option<R>) -> String {
    let Some(mut reader) = reader else {
        return String::new();
    };
    let mut buf = Vec::new();
    let _ = (&mut reader).take(MAX_CAPTURE_BYTES).read_to_end(&mut buf).await;
    // Keep the pipe drained so the child never blocks on a full buffer.
    let _ = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await;
    String::from_utf8_lossy(&buf).into_owned()
}

/// Exit code, mapping a signal death to `128 + signal`.
fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt as _;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

fn killed_by_cpu_limit(status: ExitStatus) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt as _;
        status.signal() == Some(libc::SIGXCPU)
    }
    #[cfg(not(unix))]
    {
        let _ = status;
        false
    }
}

fn hit_memory_ceiling(stderr: &str) -> bool {
    MEMORY_MARKERS.iter().any(|marker| stderr.contains(marker))
}

fn with_newline(s: &str) -> String {
    if s.is_empty() || s.ends_with('\n') {
        s.to_string()
    } else {
        format!("{s}\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_markers_are_detected() {
        assert!(hit_memory_ceiling("Traceback...\nMemoryError\n"));
        assert!(hit_memory_ceiling("terminate called after throwing an instance of 'std::bad_alloc'"));
        assert!(!hit_memory_ceiling("ZeroDivisionError: division by zero"));
    }

    #[test]
    fn newline_helper() {
        assert_eq!(with_newline(""), "");
        assert_eq!(with_newline("a"), "a\n");
        assert_eq!(with_newline("a\n"), "a\n");
    }

    #[tokio::test]
    async fn unsupported_language_is_a_sandbox_error() {
        let engine = SandboxEngine::new(ToolchainTable::empty());
        let err = engine
            .run_source("print(1)", Language::Python, &ResourceLimits::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SandboxError::UnsupportedLanguage(Language::Python)));
    }

    #[tokio::test]
    async fn invalid_limits_are_rejected_before_running() {
        let engine = SandboxEngine::default();
        let err = engine
            .run_source("echo hi", Language::Shell, &ResourceLimits::new(0, 64))
            .await
            .unwrap_err();
        assert!(matches!(err, SandboxError::InvalidConfig(_)));
    }
}
