//! Global atomic counters for the repair engine.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single `tracing::info!`
//! event, e.g. at the end of a repair.

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters: no allocations, no locking.
pub struct Metrics {
    sandbox_runs: AtomicU64,
    timeouts: AtomicU64,
    candidates_evaluated: AtomicU64,
    patches_committed: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            sandbox_runs: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            candidates_evaluated: AtomicU64::new(0),
            patches_committed: AtomicU64::new(0),
        }
    }

    pub fn inc_sandbox_runs(&self) {
        self.sandbox_runs.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "sandbox_runs", "counter incremented");
    }

    pub fn inc_timeouts(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "timeouts", "counter incremented");
    }

    pub fn inc_candidates_evaluated(&self) {
        self.candidates_evaluated.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "candidates_evaluated", "counter incremented");
    }

    pub fn inc_patches_committed(&self) {
        self.patches_committed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "patches_committed", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            sandbox_runs = self.sandbox_runs(),
            timeouts = self.timeouts(),
            candidates_evaluated = self.candidates_evaluated(),
            patches_committed = self.patches_committed(),
        );
    }

    pub fn sandbox_runs(&self) -> u64 {
        self.sandbox_runs.load(Ordering::Relaxed)
    }

    pub fn timeouts(&self) -> u64 {
        self.timeouts.load(Ordering::Relaxed)
    }

    pub fn candidates_evaluated(&self) -> u64 {
        self.candidates_evaluated.load(Ordering::Relaxed)
    }

    pub fn patches_committed(&self) -> u64 {
        self.patches_committed.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.sandbox_runs.store(0, Ordering::Relaxed);
        self.timeouts.store(0, Ordering::Relaxed);
        self.candidates_evaluated.store(0, Ordering::Relaxed);
        self.patches_committed.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = Metrics::new();
        assert_eq!(m.sandbox_runs(), 0);
        m.inc_sandbox_runs();
        m.inc_sandbox_runs();
        assert_eq!(m.sandbox_runs(), 2);

        m.inc_timeouts();
        assert_eq!(m.timeouts(), 1);

        m.inc_candidates_evaluated();
        m.inc_candidates_evaluated();
        m.inc_candidates_evaluated();
        assert_eq!(m.candidates_evaluated(), 3);

        m.inc_patches_committed();
        assert_eq!(m.patches_committed(), 1);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = Metrics::new();
        m.inc_sandbox_runs();
        m.inc_timeouts();
        m.inc_candidates_evaluated();
        m.inc_patches_committed();
        m.reset();
        assert_eq!(m.sandbox_runs(), 0);
        assert_eq!(m.timeouts(), 0);
        assert_eq!(m.candidates_evaluated(), 0);
        assert_eq!(m.patches_committed(), 0);
    }
}
