//! # SyncCache Core
//!
//! A bounded cache that keeps its items fresh in the background.
//!
//! This crate provides:
//! - A capacity-limited, LRU-evicting cache keyed by item identity
//! - A sync cycle that re-evaluates every cached item through a caller
//!   supplied callback and applies its verdict (unchanged, update, delete)
//! - Per-item consecutive-failure tracking with a retry threshold
//! - A cancellable, fixed-interval background scheduler
//!
//! ## Architecture
//!
//! Callers insert with `get_or_create` and read with `get`, directly
//! against the store. A scheduler thread runs one sync cycle per resync
//! period. A cycle walks a snapshot of the keys, peeking each item so that
//! background work never changes eviction order, and calls the sync
//! callback sequentially.
//!
//! ## Key Invariants
//!
//! - One entry per identity; `get_or_create` never overwrites
//! - Cycles from one scheduler never overlap
//! - A cycle only visits identities present when it started
//! - Callback failures are recorded on the item, never propagated
//! - Items whose retry count exceeds `max_retries` are no longer synced but
//!   stay readable with their last error

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod cancel;
mod capability;
mod config;
mod engine;
mod error;
mod item;
mod scheduler;
mod stats;
mod sync;

pub use cache::{AutoRefreshCache, CacheBuilder, EvictionObserver};
pub use cancel::CancellationToken;
pub use capability::{Counter, MetricsScope, RateLimiter, EVICTION_COUNTER};
pub use config::CacheConfig;
pub use engine::{CycleReport, ItemStore, SyncEngine};
pub use error::{CacheError, CacheResult};
pub use item::{BoxError, CacheItem, CachedItem, ItemWrapper, SyncFailure};
pub use scheduler::{Scheduler, SchedulerHandle, SCHEDULER_THREAD_NAME};
pub use stats::{CacheStats, StatsSnapshot};
pub use sync::{SyncAction, SyncContext, SyncFunction};
pub use synccache_store::{BoundedStore, StoreError};
