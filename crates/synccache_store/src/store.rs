//! Capacity-bounded store with least-recently-used eviction.

use crate::error::{StoreError, StoreResult};
use lru::LruCache;
use parking_lot::Mutex;
use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::num::NonZeroUsize;

/// Callback invoked with the key of every entry evicted for capacity.
pub type EvictionHook<K> = Box<dyn Fn(&K) + Send + Sync>;

/// A thread-safe, capacity-bounded associative store.
///
/// Entries are kept in recency order. When an insertion of a new key would
/// exceed the capacity, the least-recently-touched entry is evicted first.
///
/// # Recency
///
/// - [`get`](Self::get) and [`get_or_insert_with`](Self::get_or_insert_with)
///   touch the entry
/// - [`add`](Self::add) touches the entry it writes
/// - [`peek`](Self::peek), [`contains`](Self::contains) and
///   [`keys`](Self::keys) never change the order
///
/// # Thread Safety
///
/// Every operation holds a single internal lock for its whole duration, so
/// a reader never observes a partially applied write.
///
/// The eviction hook is invoked after the insertion has been committed and
/// the lock released, before the evicting call returns. The hook therefore
/// may call back into the store, but a concurrent reader can observe the
/// new key before the eviction has been reported.
pub struct BoundedStore<K, V> {
    entries: Mutex<LruCache<K, V>>,
    on_evict: Option<EvictionHook<K>>,
}

impl<K, V> BoundedStore<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Creates a store holding at most `capacity` entries.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ZeroCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize) -> StoreResult<Self> {
        let capacity = NonZeroUsize::new(capacity).ok_or(StoreError::ZeroCapacity)?;
        Ok(Self {
            entries: Mutex::new(LruCache::new(capacity)),
            on_evict: None,
        })
    }

    /// Creates a store that reports every capacity eviction to `hook`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ZeroCapacity`] if `capacity` is zero.
    pub fn with_eviction_hook<F>(capacity: usize, hook: F) -> StoreResult<Self>
    where
        F: Fn(&K) + Send + Sync + 'static,
    {
        let mut store = Self::new(capacity)?;
        store.on_evict = Some(Box::new(hook));
        Ok(store)
    }

    /// Returns a copy of the value for `key`, marking it recently used.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.lock().get(key).cloned()
    }

    /// Returns a copy of the value for `key` without touching its recency.
    pub fn peek<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.lock().peek(key).cloned()
    }

    /// Returns true if `key` is present. Does not touch recency.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.lock().contains(key)
    }

    /// Inserts or overwrites the value for `key`.
    ///
    /// If the store is full and `key` is new, the least-recently-touched
    /// entry is evicted and its key is returned. The eviction hook sees the
    /// evicted key once the new entry is already visible.
    pub fn add(&self, key: K, value: V) -> Option<K> {
        let evicted = {
            let mut entries = self.entries.lock();
            let existed = entries.contains(&key);
            let displaced = entries.push(key, value);
            if existed {
                None
            } else {
                displaced.map(|(evicted_key, _)| evicted_key)
            }
        };

        if let Some(evicted_key) = &evicted {
            self.notify_evicted(evicted_key);
        }
        evicted
    }

    /// Returns the value for `key`, inserting `make()` if it is absent.
    ///
    /// The lookup and the insertion happen under one lock acquisition, so
    /// concurrent callers for the same key always agree on a single value.
    /// The boolean is true when this call performed the insertion. `make`
    /// runs while the lock is held and must not call back into the store.
    pub fn get_or_insert_with<F>(&self, key: K, make: F) -> (V, bool)
    where
        F: FnOnce() -> V,
    {
        let (value, evicted) = {
            let mut entries = self.entries.lock();
            if let Some(existing) = entries.get(&key) {
                return (existing.clone(), false);
            }
            let value = make();
            let evicted = entries
                .push(key, value.clone())
                .map(|(evicted_key, _)| evicted_key);
            (value, evicted)
        };

        if let Some(evicted_key) = &evicted {
            self.notify_evicted(evicted_key);
        }
        (value, true)
    }

    /// Removes `key`, returning its value if it was present.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.lock().pop(key)
    }

    /// Returns a point-in-time copy of all keys, oldest to newest.
    pub fn keys(&self) -> Vec<K> {
        self.entries
            .lock()
            .iter()
            .rev()
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Returns the maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    fn notify_evicted(&self, key: &K) {
        if let Some(hook) = &self.on_evict {
            hook(key);
        }
    }
}

impl<K, V> fmt::Debug for BoundedStore<K, V>
where
    K: Hash + Eq,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.lock();
        f.debug_struct("BoundedStore")
            .field("len", &entries.len())
            .field("capacity", &entries.cap())
            .field("has_eviction_hook", &self.on_evict.is_some())
            .finish()
    }
}
