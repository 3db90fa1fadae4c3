//! The sync cycle.
//!
//! One cycle walks a snapshot of the cached identities and asks the sync
//! callback for a verdict on each item:
//!
//! 1. Snapshot the keys. Items inserted afterwards wait for the next cycle.
//! 2. For each key, peek the wrapper (never touching recency). Keys evicted
//!    since the snapshot are skipped silently.
//! 3. Items whose retry count exceeds `max_retries` are skipped without
//!    calling the callback. They stay readable.
//! 4. Otherwise apply the verdict: a failure re-adds the same item with one
//!    more retry, `Unchanged` does nothing, `Update` re-adds the new item
//!    with a clean streak, `Delete` removes the key.
//!
//! Items are processed sequentially on the calling thread. A slow callback
//! delays the rest of the cycle; it never causes two cycles to overlap.

use crate::cancel::CancellationToken;
use crate::item::{CacheItem, ItemWrapper, SyncFailure};
use crate::stats::CacheStats;
use crate::sync::{SyncAction, SyncContext, SyncFunction};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use synccache_store::BoundedStore;
use tracing::{debug, info, warn};

/// The store type shared by the cache and the engine.
pub type ItemStore<T> = BoundedStore<String, ItemWrapper<T>>;

/// Outcome of one sync cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// 1-based cycle number.
    pub cycle: u64,
    /// Number of identities in the cycle snapshot.
    pub snapshot_len: usize,
    /// Items the callback left unchanged.
    pub unchanged: u64,
    /// Items replaced by the callback.
    pub updated: u64,
    /// Items deleted by the callback.
    pub deleted: u64,
    /// Items whose callback failed.
    pub failed: u64,
    /// Items skipped because they exceeded the retry threshold.
    pub stalled: u64,
    /// Identities gone between the snapshot and the visit.
    pub missing: u64,
    /// Wall-clock duration of the cycle.
    pub duration: Duration,
}

impl CycleReport {
    fn new(cycle: u64, snapshot_len: usize) -> Self {
        Self {
            cycle,
            snapshot_len,
            unchanged: 0,
            updated: 0,
            deleted: 0,
            failed: 0,
            stalled: 0,
            missing: 0,
            duration: Duration::ZERO,
        }
    }

    /// Returns the number of callback invocations in this cycle.
    pub fn synced(&self) -> u64 {
        self.unchanged + self.updated + self.deleted + self.failed
    }
}

/// Runs sync cycles against a shared store.
pub struct SyncEngine<T: CacheItem> {
    store: Arc<ItemStore<T>>,
    sync_fn: Arc<dyn SyncFunction<T>>,
    max_retries: u32,
    stats: Arc<CacheStats>,
    cycles: AtomicU64,
}

impl<T: CacheItem> SyncEngine<T> {
    /// Creates an engine over `store`.
    pub fn new(
        store: Arc<ItemStore<T>>,
        sync_fn: Arc<dyn SyncFunction<T>>,
        max_retries: u32,
        stats: Arc<CacheStats>,
    ) -> Self {
        Self {
            store,
            sync_fn,
            max_retries,
            stats,
            cycles: AtomicU64::new(0),
        }
    }

    /// Returns the retry threshold.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns the number of cycles started so far.
    pub fn cycles_started(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    /// Runs one full cycle over a snapshot of the current keys.
    ///
    /// The token is handed to the callback through its [`SyncContext`];
    /// the cycle itself does not stop early when it is cancelled.
    pub fn run_cycle(&self, token: &CancellationToken) -> CycleReport {
        let started = Instant::now();
        let cycle = self.cycles.fetch_add(1, Ordering::SeqCst) + 1;
        let ctx = SyncContext::new(cycle, token.clone());

        let keys = self.store.keys();
        debug!(cycle, items = keys.len(), "starting sync cycle");

        let mut report = CycleReport::new(cycle, keys.len());
        for key in keys {
            self.sync_item(&ctx, key, &mut report);
        }

        report.duration = started.elapsed();
        self.stats.record_cycle(&report);
        debug!(
            cycle,
            unchanged = report.unchanged,
            updated = report.updated,
            deleted = report.deleted,
            failed = report.failed,
            stalled = report.stalled,
            elapsed_ms = report.duration.as_millis() as u64,
            "finished sync cycle"
        );
        report
    }

    fn sync_item(&self, ctx: &SyncContext, key: String, report: &mut CycleReport) {
        // Evicted between the snapshot and now.
        let Some(wrapper) = self.store.peek(key.as_str()) else {
            report.missing += 1;
            return;
        };

        if wrapper.is_stalled(self.max_retries) {
            info!(
                cycle = ctx.cycle(),
                id = %key,
                retries = wrapper.retry_count(),
                "item exceeded max retries and will not be retried"
            );
            report.stalled += 1;
            return;
        }

        match self.sync_fn.sync(ctx, wrapper.item()) {
            Err(err) => {
                let failure = SyncFailure::from(err);
                info!(
                    cycle = ctx.cycle(),
                    id = %key,
                    retries = wrapper.retry_count().saturating_add(1),
                    error = %failure,
                    "failed to get latest copy of item"
                );
                self.store.add(key, wrapper.record_failure(failure));
                report.failed += 1;
            }
            Ok(SyncAction::Unchanged) => {
                report.unchanged += 1;
            }
            Ok(SyncAction::Update(new_item)) => {
                if new_item.id() != key {
                    warn!(
                        id = %key,
                        new_id = new_item.id(),
                        "updated item changed identity, keeping original key"
                    );
                }
                self.store.add(key, ItemWrapper::new(new_item));
                report.updated += 1;
            }
            Ok(SyncAction::Delete) => {
                self.store.remove(key.as_str());
                report.deleted += 1;
            }
        }
    }
}

impl<T: CacheItem> fmt::Debug for SyncEngine<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncEngine")
            .field("store", &self.store)
            .field("max_retries", &self.max_retries)
            .field("cycles", &self.cycles_started())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::BoxError;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    #[derive(Debug, Clone, PartialEq)]
    struct Doc {
        id: String,
        rev: u32,
    }

    impl Doc {
        fn new(id: &str, rev: u32) -> Self {
            Self {
                id: id.to_string(),
                rev,
            }
        }
    }

    impl CacheItem for Doc {
        fn id(&self) -> &str {
            &self.id
        }
    }

    type Verdict = fn(&Doc) -> Result<SyncAction<Doc>, BoxError>;

    struct Fixture {
        store: Arc<ItemStore<Doc>>,
        engine: SyncEngine<Doc>,
        calls: Arc<Mutex<HashMap<String, u32>>>,
    }

    fn fixture(capacity: usize, max_retries: u32, verdict: Verdict) -> Fixture {
        let store = Arc::new(ItemStore::<Doc>::new(capacity).unwrap());
        let calls = Arc::new(Mutex::new(HashMap::new()));
        let seen = Arc::clone(&calls);
        let sync_fn = move |_ctx: &SyncContext, doc: &Doc| -> Result<SyncAction<Doc>, BoxError> {
            *seen.lock().entry(doc.id.clone()).or_insert(0) += 1;
            verdict(doc)
        };
        let engine = SyncEngine::new(
            Arc::clone(&store),
            Arc::new(sync_fn),
            max_retries,
            Arc::new(CacheStats::new()),
        );
        Fixture {
            store,
            engine,
            calls,
        }
    }

    fn insert(store: &ItemStore<Doc>, doc: Doc) {
        store.add(doc.id.clone(), ItemWrapper::new(doc));
    }

    #[test]
    fn empty_store_cycle() {
        let f = fixture(4, 3, |_| Ok(SyncAction::Unchanged));
        let report = f.engine.run_cycle(&CancellationToken::new());
        assert_eq!(report.cycle, 1);
        assert_eq!(report.snapshot_len, 0);
        assert_eq!(report.synced(), 0);
    }

    #[test]
    fn unchanged_leaves_wrapper_identical() {
        let f = fixture(4, 3, |_| Ok(SyncAction::Unchanged));
        insert(&f.store, Doc::new("a", 1));
        let before = f.store.peek("a").unwrap();

        let report = f.engine.run_cycle(&CancellationToken::new());

        assert_eq!(report.unchanged, 1);
        assert_eq!(f.store.peek("a").unwrap(), before);
    }

    #[test]
    fn update_replaces_and_clears_streak() {
        let f = fixture(4, 10, |doc| {
            Ok(SyncAction::Update(Doc::new(&doc.id, doc.rev + 1)))
        });
        let failing = ItemWrapper::new(Doc::new("a", 1))
            .record_failure(SyncFailure::from(BoxError::from("x")))
            .record_failure(SyncFailure::from(BoxError::from("y")))
            .record_failure(SyncFailure::from(BoxError::from("z")));
        assert_eq!(failing.retry_count(), 3);
        f.store.add("a".to_string(), failing);

        f.engine.run_cycle(&CancellationToken::new());

        let wrapper = f.store.peek("a").unwrap();
        assert_eq!(wrapper.item(), &Doc::new("a", 2));
        assert_eq!(wrapper.retry_count(), 0);
        assert!(wrapper.last_error().is_none());
    }

    #[test]
    fn delete_removes_item() {
        let f = fixture(4, 3, |_| Ok(SyncAction::Delete));
        insert(&f.store, Doc::new("a", 1));

        let report = f.engine.run_cycle(&CancellationToken::new());

        assert_eq!(report.deleted, 1);
        assert!(f.store.peek("a").is_none());
    }

    #[test]
    fn failures_accumulate_then_stall() {
        let f = fixture(4, 2, |_| Err("upstream unavailable".into()));
        insert(&f.store, Doc::new("a", 1));
        let token = CancellationToken::new();

        for expected in 1..=3 {
            let report = f.engine.run_cycle(&token);
            assert_eq!(report.failed, 1);
            assert_eq!(f.store.peek("a").unwrap().retry_count(), expected);
        }

        let report = f.engine.run_cycle(&token);
        assert_eq!(report.stalled, 1);
        assert_eq!(report.synced(), 0);
        assert_eq!(f.calls.lock()["a"], 3);

        let wrapper = f.store.peek("a").unwrap();
        assert_eq!(wrapper.item(), &Doc::new("a", 1));
        assert_eq!(
            wrapper.last_error().unwrap().to_string(),
            "upstream unavailable"
        );
    }

    #[test]
    fn cycle_does_not_touch_recency() {
        let f = fixture(2, 3, |_| Ok(SyncAction::Unchanged));
        insert(&f.store, Doc::new("a", 1));
        insert(&f.store, Doc::new("b", 1));

        f.engine.run_cycle(&CancellationToken::new());

        // "a" is still the oldest entry.
        assert_eq!(
            f.store.add("c".to_string(), ItemWrapper::new(Doc::new("c", 1))),
            Some("a".to_string())
        );
    }

    #[test]
    fn cycle_numbers_increase() {
        let f = fixture(2, 3, |_| Ok(SyncAction::Unchanged));
        let token = CancellationToken::new();
        assert_eq!(f.engine.run_cycle(&token).cycle, 1);
        assert_eq!(f.engine.run_cycle(&token).cycle, 2);
        assert_eq!(f.engine.cycles_started(), 2);
    }

    #[test]
    fn keys_removed_mid_cycle_are_skipped() {
        let store = Arc::new(ItemStore::<Doc>::new(4).unwrap());
        insert(&store, Doc::new("a", 1));
        insert(&store, Doc::new("b", 1));

        let remover = Arc::clone(&store);
        let sync_fn = move |_ctx: &SyncContext, _doc: &Doc| -> Result<SyncAction<Doc>, BoxError> {
            remover.remove("b");
            Ok(SyncAction::Unchanged)
        };
        let engine = SyncEngine::new(
            Arc::clone(&store),
            Arc::new(sync_fn),
            3,
            Arc::new(CacheStats::new()),
        );

        let report = engine.run_cycle(&CancellationToken::new());

        assert_eq!(report.snapshot_len, 2);
        assert_eq!(report.unchanged, 1);
        assert_eq!(report.missing, 1);
    }
}
