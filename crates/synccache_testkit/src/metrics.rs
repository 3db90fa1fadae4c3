//! In-memory capability implementations.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use synccache_core::{BoxError, Counter, MetricsScope, RateLimiter, SyncContext};

/// A counter backed by an atomic.
#[derive(Debug, Default)]
pub struct AtomicCounter {
    value: AtomicU64,
}

impl AtomicCounter {
    /// Returns the current value.
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::SeqCst)
    }
}

impl Counter for AtomicCounter {
    fn inc(&self) {
        self.value.fetch_add(1, Ordering::SeqCst);
    }
}

/// A metrics scope that keeps every registered counter.
#[derive(Debug, Default)]
pub struct RecordingScope {
    counters: Mutex<HashMap<String, (String, Arc<AtomicCounter>)>>,
}

impl RecordingScope {
    /// Creates an empty scope.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns the value of the counter registered as `name`, if any.
    pub fn value(&self, name: &str) -> Option<u64> {
        self.counters.lock().get(name).map(|(_, c)| c.get())
    }

    /// Returns the description the counter `name` was registered with.
    pub fn description(&self, name: &str) -> Option<String> {
        self.counters.lock().get(name).map(|(d, _)| d.clone())
    }
}

impl MetricsScope for RecordingScope {
    fn counter(&self, name: &str, description: &str) -> Arc<dyn Counter> {
        let mut counters = self.counters.lock();
        let (_, counter) = counters
            .entry(name.to_owned())
            .or_insert_with(|| (description.to_owned(), Arc::new(AtomicCounter::default())));
        Arc::clone(counter) as Arc<dyn Counter>
    }
}

/// A rate limiter that always grants and counts requests.
#[derive(Debug, Default)]
pub struct CountingRateLimiter {
    acquired: AtomicU64,
}

impl CountingRateLimiter {
    /// Creates a limiter with no recorded requests.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns how many times [`RateLimiter::acquire`] was called.
    pub fn acquired(&self) -> u64 {
        self.acquired.load(Ordering::SeqCst)
    }
}

impl RateLimiter for CountingRateLimiter {
    fn acquire(&self, _ctx: &SyncContext) -> Result<(), BoxError> {
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use synccache_core::CancellationToken;

    #[test]
    fn scope_reuses_counters_by_name() {
        let scope = RecordingScope::new();
        let first = scope.counter("hits", "cache hits");
        let second = scope.counter("hits", "ignored");
        first.inc();
        second.inc();

        assert_eq!(scope.value("hits"), Some(2));
        assert_eq!(scope.description("hits").as_deref(), Some("cache hits"));
        assert_eq!(scope.value("misses"), None);
    }

    #[test]
    fn limiter_counts_acquires() {
        let limiter = CountingRateLimiter::new();
        let ctx = SyncContext::new(1, CancellationToken::new());
        limiter.acquire(&ctx).unwrap();
        limiter.acquire(&ctx).unwrap();
        assert_eq!(limiter.acquired(), 2);
    }
}
