//! Resource-bounded execution of untrusted source files.
//!
//! [`SandboxEngine`] compiles (when the toolchain requires it) and runs one
//! source file per call in a fresh temporary directory, under a wall-clock
//! timeout, a CPU ceiling, an address-space ceiling, disabled core dumps and
//! a lowered scheduling priority. Every toolchain reports through the same
//! [`SandboxResult`] contract.

pub mod engine;
pub mod error;
pub mod language;
pub mod limits;
pub mod result;
pub mod toolchain;

pub use engine::{Executor, SandboxEngine, MAX_CAPTURE_BYTES};
pub use error::{Result, SandboxError};
pub use language::Language;
pub use limits::ResourceLimits;
pub use result::{ExecStatus, SandboxResult, Timings, SPAWN_FAILURE_EXIT_CODE, TIMEOUT_EXIT_CODE};
pub use toolchain::{SourceNaming, Toolchain, ToolchainTable};
