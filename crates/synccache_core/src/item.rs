//! Cached items and the per-item sync bookkeeping.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

/// Boxed error returned by sync callbacks.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// A value that can be held by the cache.
///
/// The identity returned by [`id`](Self::id) is the cache key. It must be
/// stable and unique for the whole tracked lifetime of the logical entity:
/// two items with the same identity occupy the same cache slot.
pub trait CacheItem: Clone + Send + Sync + 'static {
    /// Returns the stable identity of this item.
    fn id(&self) -> &str;
}

/// The most recent sync callback failure recorded against an item.
///
/// Cheap to clone; clones share the same underlying error. Two failures are
/// equal only if they are the same recorded failure.
#[derive(Clone)]
pub struct SyncFailure(Arc<dyn Error + Send + Sync + 'static>);

impl SyncFailure {
    /// Wraps an error.
    pub fn new<E>(error: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        Self(Arc::new(error))
    }

    /// Returns the underlying error.
    pub fn inner(&self) -> &(dyn Error + Send + Sync + 'static) {
        &*self.0
    }
}

impl From<BoxError> for SyncFailure {
    fn from(error: BoxError) -> Self {
        Self(Arc::from(error))
    }
}

impl PartialEq for SyncFailure {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for SyncFailure {}

impl fmt::Debug for SyncFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for SyncFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl Error for SyncFailure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&*self.0)
    }
}

/// The stored record for one identity.
///
/// Created once, when the identity is first inserted, with a zero retry
/// count and no error. Only the sync engine replaces it afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemWrapper<T> {
    item: T,
    retry_count: u32,
    last_error: Option<SyncFailure>,
}

impl<T> ItemWrapper<T> {
    /// Creates a fresh wrapper with no failures recorded.
    pub fn new(item: T) -> Self {
        Self {
            item,
            retry_count: 0,
            last_error: None,
        }
    }

    /// Keeps the item and records one more consecutive failure.
    #[must_use]
    pub fn record_failure(self, failure: SyncFailure) -> Self {
        Self {
            item: self.item,
            retry_count: self.retry_count.saturating_add(1),
            last_error: Some(failure),
        }
    }

    /// Returns the stored item.
    pub fn item(&self) -> &T {
        &self.item
    }

    /// Returns the number of consecutive callback failures.
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    /// Returns the most recent callback failure, if the streak is non-empty.
    pub fn last_error(&self) -> Option<&SyncFailure> {
        self.last_error.as_ref()
    }

    /// Returns true if background sync has given up on this item.
    pub fn is_stalled(&self, max_retries: u32) -> bool {
        self.retry_count > max_retries
    }

    /// Converts into the caller-facing view.
    pub fn into_cached(self) -> CachedItem<T> {
        CachedItem {
            item: self.item,
            sync_error: self.last_error,
        }
    }
}

/// An item read from the cache together with its last sync failure.
///
/// A failure does not hide the item: callers always receive the last item
/// stored for the identity.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedItem<T> {
    /// The stored item.
    pub item: T,
    /// The most recent sync failure, if the item is currently failing.
    pub sync_error: Option<SyncFailure>,
}

impl<T> CachedItem<T> {
    /// Returns the item, or the recorded failure if there is one.
    ///
    /// # Errors
    ///
    /// Returns the last [`SyncFailure`] recorded against the item.
    pub fn into_result(self) -> Result<T, SyncFailure> {
        match self.sync_error {
            Some(failure) => Err(failure),
            None => Ok(self.item),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Named(&'static str);

    #[derive(Debug)]
    struct Boom;

    impl fmt::Display for Boom {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("boom")
        }
    }

    impl Error for Boom {}

    #[test]
    fn new_wrapper_is_clean() {
        let wrapper = ItemWrapper::new(Named("a"));
        assert_eq!(wrapper.item(), &Named("a"));
        assert_eq!(wrapper.retry_count(), 0);
        assert!(wrapper.last_error().is_none());
    }

    #[test]
    fn record_failure_increments() {
        let first = SyncFailure::new(Boom);
        let second = SyncFailure::new(Boom);

        let wrapper = ItemWrapper::new(Named("a"))
            .record_failure(first)
            .record_failure(second.clone());

        assert_eq!(wrapper.item(), &Named("a"));
        assert_eq!(wrapper.retry_count(), 2);
        assert_eq!(wrapper.last_error(), Some(&second));
    }

    #[test]
    fn stall_threshold_is_strict() {
        let mut wrapper = ItemWrapper::new(Named("a"));
        for _ in 0..2 {
            wrapper = wrapper.record_failure(SyncFailure::new(Boom));
        }
        assert!(!wrapper.is_stalled(2));
        assert!(wrapper.is_stalled(1));
    }

    #[test]
    fn failure_equality_is_identity() {
        let failure = SyncFailure::new(Boom);
        assert_eq!(failure, failure.clone());
        assert_ne!(failure, SyncFailure::new(Boom));
        assert_eq!(failure.to_string(), "boom");
    }

    #[test]
    fn failure_from_box() {
        let boxed: BoxError = "remote unavailable".into();
        let failure = SyncFailure::from(boxed);
        assert_eq!(failure.to_string(), "remote unavailable");
        assert!(failure.source().is_some());
    }

    #[test]
    fn cached_item_into_result() {
        let ok = ItemWrapper::new(Named("a")).into_cached();
        assert_eq!(ok.into_result().unwrap(), Named("a"));

        let failure = SyncFailure::new(Boom);
        let failed = ItemWrapper::new(Named("a"))
            .record_failure(failure.clone())
            .into_cached();
        assert_eq!(failed.item, Named("a"));
        assert_eq!(failed.into_result().unwrap_err(), failure);
    }
}
