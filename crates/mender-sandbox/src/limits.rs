//! Resource ceilings and the child-process confinement that enforces them.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SandboxError};

/// Bounds applied to every sandboxed execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceLimits {
    /// Wall-clock limit for the run step, in seconds.
    pub timeout_secs: u64,

    /// Wall-clock limit for the compile step, in seconds.
    pub compile_timeout_secs: u64,

    /// Address-space ceiling for the run step, in megabytes.
    pub memory_limit_mb: u64,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            timeout_secs: 5,
            compile_timeout_secs: 10,
            memory_limit_mb: 512,
        }
    }
}

impl ResourceLimits {
    pub fn new(timeout_secs: u64, memory_limit_mb: u64) -> Self {
        Self {
            timeout_secs,
            memory_limit_mb,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(SandboxError::InvalidConfig(
                "timeout_secs must be > 0".to_string(),
            ));
        }
        if self.compile_timeout_secs == 0 {
            return Err(SandboxError::InvalidConfig(
                "compile_timeout_secs must be > 0".to_string(),
            ));
        }
        if self.memory_limit_mb == 0 {
            return Err(SandboxError::InvalidConfig(
                "memory_limit_mb must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn memory_limit_bytes(&self) -> u64 {
        self.memory_limit_mb.saturating_mul(1024 * 1024)
    }
}

/// What a single child process is confined to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Confinement {
    pub cpu_secs: u64,
    pub address_space_bytes: Option<u64>,
}

/// Install the confinement hook on `cmd`.
///
/// The child becomes the leader of its own process group so that a timeout
/// can kill everything it spawned. Core dumps are disabled and the
/// scheduling priority is lowered.
#[cfg(unix)]
pub(crate) fn confine(cmd: &mut tokio::process::Command, confinement: Confinement) {
    unsafe {
        cmd.pre_exec(move || apply(&confinement));
    }
}

#[cfg(not(unix))]
pub(crate) fn confine(_cmd: &mut tokio::process::Command, _confinement: Confinement) {}

#[cfg(unix)]
fn apply(confinement: &Confinement) -> std::io::Result<()> {
    unsafe {
        if libc::setpgid(0, 0) != 0 {
            return Err(std::io::Error::last_os_error());
        }

        let core = libc::rlimit {
            rlim_cur: 0,
            rlim_max: 0,
        };
        if libc::setrlimit(libc::RLIMIT_CORE, &core) != 0 {
            return Err(std::io::Error::last_os_error());
        }

        let cpu = confinement.cpu_secs as libc::rlim_t;
        let cpu = libc::rlimit {
            rlim_cur: cpu,
            rlim_max: cpu,
        };
        if libc::setrlimit(libc::RLIMIT_CPU, &cpu) != 0 {
            return Err(std::io::Error::last_os_error());
        }

        #[cfg(any(target_os = "linux", target_os = "android"))]
        if let Some(bytes) = confinement.address_space_bytes {
            #[allow(clippy::useless_conversion)]
            let v: libc::rlim_t = bytes as libc::rlim_t;
            let as_limit = libc::rlimit {
                rlim_cur: v,
                rlim_max: v,
            };
            if libc::setrlimit(libc::RLIMIT_AS, &as_limit) != 0 {
                return Err(std::io::Error::last_os_error());
            }
        }

        // Priority and network isolation are best effort: an unprivileged
        // caller cannot always create a network namespace.
        libc::nice(10);
        #[cfg(target_os = "linux")]
        {
            libc::unshare(libc::CLONE_NEWNET);
        }
    }
    Ok(())
}

/// Kill every process in the group led by `pid`.
#[cfg(unix)]
pub(crate) fn kill_group(pid: u32) {
    unsafe {
        libc::kill(-(pid as libc::pid_t), libc::SIGKILL);
    }
}

#[cfg(not(unix))]
pub(crate) fn kill_group(_pid: u32) {}
