//! The uniform result contract shared by every toolchain.

use serde::{Deserialize, Serialize};

use crate::language::Language;

/// Exit code reported for a run killed at its wall-clock or CPU deadline.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Exit code reported when the child could not be spawned at all.
pub const SPAWN_FAILURE_EXIT_CODE: i32 = 127;

/// How an execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecStatus {
    /// The program ran to completion (with any exit code).
    Completed,
    /// The compile step exited non-zero; the run step was skipped.
    CompileFailed,
    /// Killed at the wall-clock deadline or by the CPU ceiling.
    TimedOut,
    /// The program hit the memory ceiling.
    MemoryExceeded,
    /// The toolchain binary could not be started.
    SpawnFailed,
}

impl ExecStatus {
    /// Timeout or memory breach.
    pub fn is_resource_violation(&self) -> bool {
        matches!(self, ExecStatus::TimedOut | ExecStatus::MemoryExceeded)
    }
}

/// Wall-clock durations of each step, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timings {
    pub compile_ms: Option<u64>,
    pub run_ms: Option<u64>,
}

impl Timings {
    pub fn total_ms(&self) -> u64 {
        self.compile_ms.unwrap_or(0) + self.run_ms.unwrap_or(0)
    }
}

/// Outcome of one sandboxed execution. Fresh per invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxResult {
    pub language: Language,
    pub status: ExecStatus,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// The last command the sandbox ran (the compile command when it failed).
    pub executed_command: Vec<String>,
    pub timings: Timings,
}

impl SandboxResult {
    /// A result for a child that could not be started.
    pub fn spawn_failed(language: Language, command: Vec<String>, reason: impl Into<String>) -> Self {
        Self {
            language,
            status: ExecStatus::SpawnFailed,
            exit_code: SPAWN_FAILURE_EXIT_CODE,
            stdout: String::new(),
            stderr: reason.into(),
            executed_command: command,
            timings: Timings::default(),
        }
    }

    /// Whether the program ran to completion and exited 0.
    pub fn succeeded(&self) -> bool {
        self.status == ExecStatus::Completed && self.exit_code == 0
    }

    pub fn timed_out(&self) -> bool {
        self.status == ExecStatus::TimedOut
    }
}
