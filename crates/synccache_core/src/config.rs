//! Configuration for the cache.

use crate::error::{CacheError, CacheResult};
use std::time::Duration;

/// Configuration for an [`crate::AutoRefreshCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Fixed interval between the starts of two sync cycles.
    pub resync_period: Duration,

    /// Maximum number of items held. Must be positive.
    pub max_size: usize,

    /// Consecutive callback failures tolerated before an item is no longer
    /// synced. An item is skipped once its retry count exceeds this value.
    pub max_retries: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            resync_period: Duration::from_secs(30),
            max_size: 1000,
            max_retries: 5,
        }
    }
}

impl CacheConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the resync period.
    #[must_use]
    pub const fn with_resync_period(mut self, period: Duration) -> Self {
        self.resync_period = period;
        self
    }

    /// Sets the maximum number of items.
    #[must_use]
    pub const fn with_max_size(mut self, size: usize) -> Self {
        self.max_size = size;
        self
    }

    /// Sets the retry threshold.
    #[must_use]
    pub const fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Checks the settings that the store does not validate itself.
    ///
    /// A zero `max_size` is rejected by the store at construction, with
    /// the store's own error.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidConfig`] if the resync period is zero.
    pub fn validate(&self) -> CacheResult<()> {
        if self.resync_period.is_zero() {
            return Err(CacheError::InvalidConfig(
                "resync period must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
