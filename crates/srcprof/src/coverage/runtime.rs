//! Counter Runtime
//!
//! Process-wide counter array shared by every instrumented unit.
//!
//! Increments use a relaxed load followed by a relaxed store rather than a
//! read-modify-write. Concurrent increments of the same slot can therefore
//! be lost; counts are a lower bound under contention, never an over-count.

use super::snapshot::CountsSnapshot;
use crate::result::{ProfError, ProfResult};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Fixed-size counter array with a one-shot drain
#[derive(Debug)]
pub struct CounterRuntime {
    counters: Box<[AtomicU64]>,
    output: PathBuf,
    flushed: AtomicBool,
}

static GLOBAL: OnceLock<CounterRuntime> = OnceLock::new();

impl CounterRuntime {
    /// Allocate `counter_count` zeroed counters draining to `output`
    #[must_use]
    pub fn new(counter_count: usize, output: impl Into<PathBuf>) -> Self {
        Self {
            counters: (0..counter_count).map(|_| AtomicU64::new(0)).collect(),
            output: output.into(),
            flushed: AtomicBool::new(false),
        }
    }

    /// Number of counters
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    /// Whether the array is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Snapshot destination
    #[must_use]
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Record entry into a block; out-of-range ids are ignored
    #[inline]
    pub fn hit(&self, id: usize) {
        if let Some(slot) = self.counters.get(id) {
            let value = slot.load(Ordering::Relaxed);
            slot.store(value.wrapping_add(1), Ordering::Relaxed);
        }
    }

    /// Record one side of a decision and pass the condition through
    #[inline]
    pub fn branch(&self, condition: bool, true_id: usize, false_id: usize) -> bool {
        self.hit(if condition { true_id } else { false_id });
        condition
    }

    /// Current counter values
    #[must_use]
    pub fn snapshot(&self) -> CountsSnapshot {
        CountsSnapshot::new(
            self.counters
                .iter()
                .map(|c| c.load(Ordering::Relaxed))
                .collect(),
        )
    }

    /// Whether the counters were already drained
    #[must_use]
    pub fn is_flushed(&self) -> bool {
        self.flushed.load(Ordering::Acquire)
    }

    /// Write the snapshot once.
    ///
    /// Returns `Ok(false)` without writing when a previous call already
    /// drained the counters.
    pub fn flush(&self) -> ProfResult<bool> {
        if self.flushed.swap(true, Ordering::AcqRel) {
            return Ok(false);
        }
        let snapshot = self.snapshot();
        snapshot.save(&self.output)?;
        debug!(
            path = %self.output.display(),
            counters = snapshot.len(),
            "Wrote counts snapshot"
        );
        Ok(true)
    }

    // =========================================================================
    // Process-wide instance
    // =========================================================================

    /// Install the process-wide runtime.
    ///
    /// The returned guard drains the counters when dropped, which covers
    /// normal returns and unwinding but not abrupt termination.
    pub fn install(counter_count: usize, output: impl Into<PathBuf>) -> ProfResult<FlushGuard> {
        let runtime = Self::new(counter_count, output);
        GLOBAL
            .set(runtime)
            .map_err(|_| ProfError::invalid_state("counter runtime already installed"))?;
        Ok(FlushGuard { _private: () })
    }

    /// The installed runtime, if any
    #[must_use]
    pub fn global() -> Option<&'static Self> {
        GLOBAL.get()
    }
}

/// Increment a counter of the installed runtime; a no-op when none is installed
#[inline]
pub fn inc(id: usize) {
    if let Some(runtime) = GLOBAL.get() {
        runtime.hit(id);
    }
}

/// Record a decision side on the installed runtime
#[inline]
pub fn branch(condition: bool, true_id: usize, false_id: usize) -> bool {
    match GLOBAL.get() {
        Some(runtime) => runtime.branch(condition, true_id, false_id),
        None => condition,
    }
}

/// Drains the process-wide runtime on drop
#[derive(Debug)]
#[must_use = "counters are only written when the guard is dropped"]
pub struct FlushGuard {
    _private: (),
}

impl FlushGuard {
    /// Drain now instead of at drop
    pub fn flush(&self) -> ProfResult<bool> {
        GLOBAL
            .get()
            .ok_or_else(|| ProfError::invalid_state("counter runtime not installed"))?
            .flush()
    }
}

impl Drop for FlushGuard {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!(error = %e, "Failed to write counts snapshot");
        }
    }
}
