//! Cache statistics.
//!
//! Counters for monitoring how the background sync is keeping up.
//!
//! # Usage
//!
//! ```rust,ignore
//! let cache = AutoRefreshCache::new(config, sync_fn)?;
//! cache.start(token)?;
//!
//! let stats = cache.stats();
//! println!("Cycles: {}", stats.cycles_completed);
//! println!("Failures: {}", stats.sync_failures);
//! println!("Evictions: {}", stats.evictions);
//! ```

use crate::engine::CycleReport;
use std::sync::atomic::{AtomicU64, Ordering};

/// Cache statistics.
///
/// All counters are atomic and can be read while a cycle is in progress.
/// Values are monotonically increasing.
#[derive(Debug, Default)]
pub struct CacheStats {
    // Cycle counters
    /// Total number of completed sync cycles.
    cycles_completed: AtomicU64,
    /// Total number of scheduler ticks folded into a late tick.
    ticks_coalesced: AtomicU64,

    // Per-item outcomes
    /// Identities taken from a cycle snapshot.
    items_visited: AtomicU64,
    /// Items the callback left unchanged.
    items_unchanged: AtomicU64,
    /// Items replaced by the callback.
    items_updated: AtomicU64,
    /// Items deleted by the callback.
    items_deleted: AtomicU64,
    /// Callback failures.
    sync_failures: AtomicU64,
    /// Items skipped because they exceeded the retry threshold.
    stalled_skips: AtomicU64,
    /// Identities gone between the snapshot and the visit.
    missing_skips: AtomicU64,

    // Store counters
    /// Capacity evictions.
    evictions: AtomicU64,
}

impl CacheStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one finished cycle into the totals.
    pub(crate) fn record_cycle(&self, report: &CycleReport) {
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
        self.items_visited
            .fetch_add(report.snapshot_len as u64, Ordering::Relaxed);
        self.items_unchanged
            .fetch_add(report.unchanged, Ordering::Relaxed);
        self.items_updated.fetch_add(report.updated, Ordering::Relaxed);
        self.items_deleted.fetch_add(report.deleted, Ordering::Relaxed);
        self.sync_failures.fetch_add(report.failed, Ordering::Relaxed);
        self.stalled_skips.fetch_add(report.stalled, Ordering::Relaxed);
        self.missing_skips.fetch_add(report.missing, Ordering::Relaxed);
    }

    /// Records a capacity eviction.
    pub(crate) fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    /// Records scheduler ticks that were folded into a late tick.
    pub(crate) fn record_coalesced_ticks(&self, ticks: u64) {
        self.ticks_coalesced.fetch_add(ticks, Ordering::Relaxed);
    }

    /// Returns the total number of completed sync cycles.
    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed.load(Ordering::Relaxed)
    }

    /// Returns the total number of callback failures.
    pub fn sync_failures(&self) -> u64 {
        self.sync_failures.load(Ordering::Relaxed)
    }

    /// Returns the total number of capacity evictions.
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of all stats.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cycles_completed: self.cycles_completed(),
            ticks_coalesced: self.ticks_coalesced.load(Ordering::Relaxed),
            items_visited: self.items_visited.load(Ordering::Relaxed),
            items_unchanged: self.items_unchanged.load(Ordering::Relaxed),
            items_updated: self.items_updated.load(Ordering::Relaxed),
            items_deleted: self.items_deleted.load(Ordering::Relaxed),
            sync_failures: self.sync_failures(),
            stalled_skips: self.stalled_skips.load(Ordering::Relaxed),
            missing_skips: self.missing_skips.load(Ordering::Relaxed),
            evictions: self.evictions(),
        }
    }
}

/// A point-in-time snapshot of cache statistics.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Total number of completed sync cycles.
    pub cycles_completed: u64,
    /// Total number of scheduler ticks folded into a late tick.
    pub ticks_coalesced: u64,
    /// Identities taken from cycle snapshots.
    pub items_visited: u64,
    /// Items the callback left unchanged.
    pub items_unchanged: u64,
    /// Items replaced by the callback.
    pub items_updated: u64,
    /// Items deleted by the callback.
    pub items_deleted: u64,
    /// Callback failures.
    pub sync_failures: u64,
    /// Items skipped because they exceeded the retry threshold.
    pub stalled_skips: u64,
    /// Identities gone between the snapshot and the visit.
    pub missing_skips: u64,
    /// Capacity evictions.
    pub evictions: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn default_stats_are_zero() {
        let stats = CacheStats::new();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn record_cycle_accumulates() {
        let stats = CacheStats::new();
        let report = CycleReport {
            cycle: 1,
            snapshot_len: 6,
            unchanged: 1,
            updated: 2,
            deleted: 1,
            failed: 1,
            stalled: 1,
            missing: 0,
            duration: Duration::from_millis(3),
        };

        stats.record_cycle(&report);
        stats.record_cycle(&report);

        let snap = stats.snapshot();
        assert_eq!(snap.cycles_completed, 2);
        assert_eq!(snap.items_visited, 12);
        assert_eq!(snap.items_updated, 4);
        assert_eq!(snap.sync_failures, 2);
        assert_eq!(snap.stalled_skips, 2);
    }

    #[test]
    fn concurrent_evictions() {
        use std::sync::Arc;
        use std::thread;

        let stats = Arc::new(CacheStats::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let s = Arc::clone(&stats);
                thread::spawn(move || {
                    for _ in 0..100 {
                        s.record_eviction();
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(stats.evictions(), 800);
    }
}
