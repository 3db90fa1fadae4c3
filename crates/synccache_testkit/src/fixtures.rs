//! Test fixtures.

use std::thread;
use std::time::{Duration, Instant};
use synccache_core::{CacheConfig, CacheItem};

/// A minimal cache item: an identity and a version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TestItem {
    /// Identity.
    pub id: String,
    /// Payload version, bumped by test callbacks.
    pub version: u64,
}

impl TestItem {
    /// Creates an item.
    pub fn new(id: impl Into<String>, version: u64) -> Self {
        Self {
            id: id.into(),
            version,
        }
    }

    /// Returns a copy with the next version.
    #[must_use]
    pub fn bumped(&self) -> Self {
        Self {
            id: self.id.clone(),
            version: self.version + 1,
        }
    }
}

impl CacheItem for TestItem {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Configuration used by most tests: small, fast and a low retry threshold.
pub fn test_config() -> CacheConfig {
    CacheConfig::new()
        .with_max_size(16)
        .with_max_retries(3)
        .with_resync_period(Duration::from_millis(20))
}

/// Polls `condition` until it holds or `timeout` passes.
///
/// Returns the final value of the condition.
pub fn wait_for<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(2));
    }
}
