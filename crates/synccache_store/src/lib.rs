//! # SyncCache Store
//!
//! Bounded, recency-evicting store for SyncCache.
//!
//! This crate provides the lowest layer of the cache: a capacity-limited
//! associative container. The store does not interpret the values it
//! holds; retry bookkeeping and refresh logic live in `synccache_core`.
//!
//! ## Design Principles
//!
//! - Fixed capacity, chosen at construction
//! - Least-recently-touched entry is evicted first
//! - `get` touches, `peek` does not
//! - `keys` returns a copy, safe to iterate during concurrent mutation
//! - Must be `Send + Sync`; one coarse lock guards the whole structure
//!
//! ## Example
//!
//! ```rust
//! use synccache_store::BoundedStore;
//!
//! let store = BoundedStore::new(2).unwrap();
//! store.add("a", 1);
//! store.add("b", 2);
//! store.get(&"a");
//!
//! // "b" is now the least recently touched entry
//! assert_eq!(store.add("c", 3), Some("b"));
//! assert_eq!(store.keys(), vec!["a", "c"]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod store;

pub use error::{StoreError, StoreResult};
pub use store::{BoundedStore, EvictionHook};
