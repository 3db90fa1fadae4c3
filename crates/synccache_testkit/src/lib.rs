//! # SyncCache Testkit
//!
//! Test utilities for SyncCache.
//!
//! This crate provides:
//! - A ready-made cache item and configuration fixtures
//! - Recording sync callbacks (invocation counts, per-cycle visit order,
//!   concurrency high-water mark) with optional blocking gates
//! - A recording metrics scope and a counting rate limiter
//! - Property-based test generators using proptest
//! - Tracing setup for tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use synccache_testkit::prelude::*;
//!
//! #[test]
//! fn counts_calls() {
//!     let sync = RecordingSync::unchanged();
//!     let cache = AutoRefreshCache::new(test_config(), sync.clone()).unwrap();
//!     cache.get_or_create(TestItem::new("a", 1));
//!     cache.sync_once(&CancellationToken::new());
//!     assert_eq!(sync.calls_for("a"), 1);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod callbacks;
pub mod fixtures;
pub mod generators;
pub mod logging;
pub mod metrics;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::callbacks::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::logging::*;
    pub use crate::metrics::*;
    pub use synccache_core::{
        AutoRefreshCache, CacheConfig, CacheError, CancellationToken, SyncAction, SyncContext,
    };
}

pub use callbacks::*;
pub use fixtures::*;
pub use generators::*;
pub use logging::*;
pub use metrics::*;
