//! Error types for the cache.

use std::io;
use synccache_store::StoreError;
use thiserror::Error;

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors that can occur in cache operations.
///
/// Callback failures are not represented here: they are recorded against
/// the item as a [`crate::SyncFailure`] and surfaced through reads.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The identity was never inserted, or has since been evicted or deleted.
    #[error("item not found in cache: {id}")]
    NotFound {
        /// The identity that was looked up.
        id: String,
    },

    /// The backing store could not be created.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The background scheduler thread could not be spawned.
    #[error("failed to spawn scheduler thread: {0}")]
    SchedulerSpawn(#[source] io::Error),

    /// The background scheduler thread panicked.
    #[error("scheduler thread panicked")]
    SchedulerPanicked,
}

impl CacheError {
    /// Creates a not-found error for `id`.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Returns true if this is a [`CacheError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = CacheError::not_found("item-1");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "item not found in cache: item-1");
    }

    #[test]
    fn store_error_is_transparent() {
        let err = CacheError::from(StoreError::ZeroCapacity);
        assert_eq!(err.to_string(), StoreError::ZeroCapacity.to_string());
        assert!(!err.is_not_found());
    }
}
