//! Check counters.
//!
//! Relaxed atomics so a shared reference can record from inside a formatting pass; read
//! them through `snapshot`.

use std::sync::atomic::{AtomicU64, Ordering::Relaxed};

#[derive(Debug, Default)]
pub struct CheckMetrics {
    passes: AtomicU64,
    words_checked: AtomicU64,
    misspelled: AtomicU64,
    no_spell_skipped: AtomicU64,
    ranges_scheduled: AtomicU64,
    ranges_coalesced: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CheckMetricsSnapshot {
    /// Completed `recheck` walks.
    pub passes: u64,
    /// Words handed to the speller.
    pub words_checked: u64,
    pub misspelled: u64,
    /// Words inside no-spell regions (accepted without a lookup).
    pub no_spell_skipped: u64,
    pub ranges_scheduled: u64,
    /// Scheduled ranges folded into a neighbour before checking.
    pub ranges_coalesced: u64,
}

impl CheckMetrics {
    pub fn snapshot(&self) -> CheckMetricsSnapshot {
        CheckMetricsSnapshot {
            passes: self.passes.load(Relaxed),
            words_checked: self.words_checked.load(Relaxed),
            misspelled: self.misspelled.load(Relaxed),
            no_spell_skipped: self.no_spell_skipped.load(Relaxed),
            ranges_scheduled: self.ranges_scheduled.load(Relaxed),
            ranges_coalesced: self.ranges_coalesced.load(Relaxed),
        }
    }

    pub(crate) fn record_pass(&self, stats: &crate::CheckStats) {
        self.passes.fetch_add(1, Relaxed);
        self.words_checked
            .fetch_add(stats.words_checked as u64, Relaxed);
        self.misspelled.fetch_add(stats.misspelled as u64, Relaxed);
        self.no_spell_skipped
            .fetch_add(stats.no_spell_skipped as u64, Relaxed);
    }

    pub(crate) fn record_schedule(&self, scheduled: usize, coalesced: usize) {
        self.ranges_scheduled.fetch_add(scheduled as u64, Relaxed);
        self.ranges_coalesced.fetch_add(coalesced as u64, Relaxed);
    }
}
