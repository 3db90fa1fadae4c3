//! The public cache.

use crate::cancel::CancellationToken;
use crate::capability::{Counter, MetricsScope, RateLimiter, EVICTION_COUNTER};
use crate::config::CacheConfig;
use crate::engine::{CycleReport, ItemStore, SyncEngine};
use crate::error::{CacheError, CacheResult};
use crate::item::{CacheItem, CachedItem, ItemWrapper};
use crate::scheduler::{Scheduler, SchedulerHandle};
use crate::stats::{CacheStats, StatsSnapshot};
use crate::sync::SyncFunction;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Callback invoked with the identity of every evicted item.
pub type EvictionObserver = Arc<dyn Fn(&str) + Send + Sync>;

/// A bounded cache that keeps its items fresh in the background.
///
/// Items are inserted once with [`get_or_create`](Self::get_or_create) and
/// read with [`get`](Self::get). After [`start`](Self::start), a background
/// thread re-runs the sync callback on every cached item once per resync
/// period and applies its verdict. Callers never wait for a cycle.
///
/// Cloning is cheap: clones share the same store and engine.
///
/// # Example
///
/// ```rust
/// use synccache_core::{
///     AutoRefreshCache, BoxError, CacheConfig, CacheItem, CancellationToken, SyncAction,
///     SyncContext,
/// };
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Job {
///     name: String,
///     done: bool,
/// }
///
/// impl CacheItem for Job {
///     fn id(&self) -> &str {
///         &self.name
///     }
/// }
///
/// let sync = |_ctx: &SyncContext, job: &Job| -> Result<SyncAction<Job>, BoxError> {
///     Ok(SyncAction::Update(Job { done: true, ..job.clone() }))
/// };
///
/// let cache = AutoRefreshCache::new(CacheConfig::new().with_max_size(10), sync).unwrap();
/// cache.get_or_create(Job { name: "build".into(), done: false });
///
/// cache.sync_once(&CancellationToken::new());
/// assert!(cache.get("build").unwrap().item.done);
/// ```
pub struct AutoRefreshCache<T: CacheItem> {
    inner: Arc<CacheInner<T>>,
}

struct CacheInner<T: CacheItem> {
    config: CacheConfig,
    store: Arc<ItemStore<T>>,
    engine: Arc<SyncEngine<T>>,
    stats: Arc<CacheStats>,
    rate_limiter: Option<Arc<dyn RateLimiter>>,
}

impl<T: CacheItem> AutoRefreshCache<T> {
    /// Creates a cache with no optional capabilities.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Store`] if `max_size` is zero and
    /// [`CacheError::InvalidConfig`] if the resync period is zero.
    pub fn new<F>(config: CacheConfig, sync_fn: F) -> CacheResult<Self>
    where
        F: SyncFunction<T> + 'static,
    {
        CacheBuilder::new(sync_fn).config(config).build()
    }

    /// Starts building a cache around `sync_fn`.
    pub fn builder<F>(sync_fn: F) -> CacheBuilder<T>
    where
        F: SyncFunction<T> + 'static,
    {
        CacheBuilder::new(sync_fn)
    }

    /// Returns the item stored for `id` and its last sync failure.
    ///
    /// Counts as a use for eviction purposes.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::NotFound`] if `id` was never inserted or has
    /// been evicted or deleted since.
    pub fn get(&self, id: &str) -> CacheResult<CachedItem<T>> {
        self.inner
            .store
            .get(id)
            .map(ItemWrapper::into_cached)
            .ok_or_else(|| CacheError::not_found(id))
    }

    /// Returns the item stored under `item.id()`, inserting `item` if there
    /// is none.
    ///
    /// When the identity is already cached, `item` is discarded and the
    /// stored item is returned together with its last sync failure. There
    /// is no way to overwrite a cached item from here. Inserting may evict
    /// the least recently used entry.
    pub fn get_or_create(&self, item: T) -> CachedItem<T> {
        let key = item.id().to_owned();
        let (wrapper, inserted) = self
            .inner
            .store
            .get_or_insert_with(key, || ItemWrapper::new(item));
        if inserted {
            debug!(id = wrapper.item().id(), "inserted item");
        }
        wrapper.into_cached()
    }

    /// Starts the background resync loop bound to `token`.
    ///
    /// Each call starts another independent loop; callers should start a
    /// cache once.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::SchedulerSpawn`] if the thread cannot be created.
    pub fn start(&self, token: CancellationToken) -> CacheResult<SchedulerHandle> {
        self.scheduler().spawn(token)
    }

    /// Runs the resync loop on the current thread until `token` is cancelled.
    pub fn run(&self, token: &CancellationToken) {
        self.scheduler().run(token);
    }

    /// Runs a single sync cycle on the current thread.
    ///
    /// Not coordinated with a running scheduler: a cycle started here may
    /// overlap one started by [`start`](Self::start).
    pub fn sync_once(&self, token: &CancellationToken) -> CycleReport {
        self.inner.engine.run_cycle(token)
    }

    /// Returns the wrapper stored for `id` without touching its recency.
    pub fn inspect(&self, id: &str) -> Option<ItemWrapper<T>> {
        self.inner.store.peek(id)
    }

    /// Returns true if `id` is cached. Does not touch recency.
    pub fn contains(&self, id: &str) -> bool {
        self.inner.store.contains(id)
    }

    /// Returns the number of cached items.
    pub fn len(&self) -> usize {
        self.inner.store.len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.inner.store.is_empty()
    }

    /// Returns the configuration the cache was built with.
    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Returns the rate limiter supplied at construction.
    pub fn rate_limiter(&self) -> Option<&Arc<dyn RateLimiter>> {
        self.inner.rate_limiter.as_ref()
    }

    /// Returns a snapshot of the cache statistics.
    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    fn scheduler(&self) -> Scheduler<T> {
        Scheduler::new(
            Arc::clone(&self.inner.engine),
            self.inner.config.resync_period,
            Arc::clone(&self.inner.stats),
        )
    }
}

impl<T: CacheItem> Clone for AutoRefreshCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: CacheItem> fmt::Debug for AutoRefreshCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoRefreshCache")
            .field("config", &self.inner.config)
            .field("len", &self.len())
            .field("has_rate_limiter", &self.inner.rate_limiter.is_some())
            .finish()
    }
}

/// Builder for an [`AutoRefreshCache`] with optional capabilities.
pub struct CacheBuilder<T: CacheItem> {
    sync_fn: Arc<dyn SyncFunction<T>>,
    config: CacheConfig,
    rate_limiter: Option<Arc<dyn RateLimiter>>,
    metrics_scope: Option<Arc<dyn MetricsScope>>,
    eviction_observer: Option<EvictionObserver>,
}

impl<T: CacheItem> CacheBuilder<T> {
    /// Creates a builder with the default configuration.
    pub fn new<F>(sync_fn: F) -> Self
    where
        F: SyncFunction<T> + 'static,
    {
        Self {
            sync_fn: Arc::new(sync_fn),
            config: CacheConfig::default(),
            rate_limiter: None,
            metrics_scope: None,
            eviction_observer: None,
        }
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the rate limiter retained for the caller's sync callback.
    #[must_use]
    pub fn rate_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    /// Sets the scope that receives the eviction counter.
    #[must_use]
    pub fn metrics_scope(mut self, scope: Arc<dyn MetricsScope>) -> Self {
        self.metrics_scope = Some(scope);
        self
    }

    /// Sets a callback invoked with each evicted identity.
    #[must_use]
    pub fn eviction_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.eviction_observer = Some(Arc::new(observer));
        self
    }

    /// Builds the cache.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Store`] if `max_size` is zero and
    /// [`CacheError::InvalidConfig`] if the resync period is zero.
    pub fn build(self) -> CacheResult<AutoRefreshCache<T>> {
        let stats = Arc::new(CacheStats::new());
        let eviction_counter: Option<Arc<dyn Counter>> = self
            .metrics_scope
            .as_ref()
            .map(|scope| scope.counter(EVICTION_COUNTER, "Counter for evictions from LRU"));
        let observer = self.eviction_observer;
        let hook_stats = Arc::clone(&stats);

        let store = ItemStore::<T>::with_eviction_hook(self.config.max_size, move |id: &String| {
            debug!(id = %id, "evicted item");
            hook_stats.record_eviction();
            if let Some(counter) = &eviction_counter {
                counter.inc();
            }
            if let Some(observer) = &observer {
                observer(id.as_str());
            }
        })?;
        self.config.validate()?;

        let store = Arc::new(store);
        let engine = Arc::new(SyncEngine::new(
            Arc::clone(&store),
            self.sync_fn,
            self.config.max_retries,
            Arc::clone(&stats),
        ));

        Ok(AutoRefreshCache {
            inner: Arc::new(CacheInner {
                config: self.config,
                store,
                engine,
                stats,
                rate_limiter: self.rate_limiter,
            }),
        })
    }
}
