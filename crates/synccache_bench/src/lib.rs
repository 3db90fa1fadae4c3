//! Benchmark utilities for SyncCache.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use rand::seq::SliceRandom;
use rand::Rng;
use synccache_core::{
    AutoRefreshCache, BoxError, CacheConfig, SyncAction, SyncContext, SyncFunction,
};
use synccache_testkit::TestItem;

/// Generates `count` distinct identities.
pub fn generate_ids(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("item-{i:06}")).collect()
}

/// Generates `count` items with random versions.
pub fn generate_items(count: usize) -> Vec<TestItem> {
    let mut rng = rand::thread_rng();
    generate_ids(count)
        .into_iter()
        .map(|id| TestItem::new(id, rng.gen_range(0..1_000)))
        .collect()
}

/// Returns `ids` in random order.
pub fn shuffled(ids: &[String]) -> Vec<String> {
    let mut ids = ids.to_vec();
    ids.shuffle(&mut rand::thread_rng());
    ids
}

/// Builds a cache of the given capacity filled with `count` items.
pub fn filled_cache<F>(capacity: usize, count: usize, sync_fn: F) -> AutoRefreshCache<TestItem>
where
    F: SyncFunction<TestItem> + 'static,
{
    let config = CacheConfig::new().with_max_size(capacity);
    let cache = AutoRefreshCache::new(config, sync_fn).expect("valid bench config");
    for item in generate_items(count) {
        cache.get_or_create(item);
    }
    cache
}

/// Sync callback that leaves every item unchanged.
pub fn unchanged(_ctx: &SyncContext, _item: &TestItem) -> Result<SyncAction<TestItem>, BoxError> {
    Ok(SyncAction::Unchanged)
}

/// Sync callback that bumps every item's version.
pub fn bump(_ctx: &SyncContext, item: &TestItem) -> Result<SyncAction<TestItem>, BoxError> {
    Ok(SyncAction::Update(item.bumped()))
}
