//! Optional capabilities injected at construction.

use crate::item::BoxError;
use crate::sync::SyncContext;
use std::sync::Arc;

/// Name of the counter registered with a [`MetricsScope`] for evictions.
pub const EVICTION_COUNTER: &str = "lru_evictions";

/// A monotonically increasing metric.
pub trait Counter: Send + Sync {
    /// Increments the counter by one.
    fn inc(&self);
}

/// A sink that hands out named counters.
///
/// The cache registers [`EVICTION_COUNTER`] once at construction and
/// increments it on every capacity eviction.
pub trait MetricsScope: Send + Sync {
    /// Returns the counter registered under `name`.
    fn counter(&self, name: &str, description: &str) -> Arc<dyn Counter>;
}

/// Throttles calls to a remote system.
///
/// Accepted and retained by the cache so callers can share one limiter
/// between the cache and their sync callback. The sync cycle itself never
/// calls it.
pub trait RateLimiter: Send + Sync {
    /// Blocks until a call is permitted.
    ///
    /// # Errors
    ///
    /// Returns an error if no permit can be obtained, for example because
    /// the context was cancelled.
    fn acquire(&self, ctx: &SyncContext) -> Result<(), BoxError>;
}
