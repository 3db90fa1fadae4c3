//! Property-based test generators using proptest.
//!
//! Provides strategies for cache items, caller operations and scripted
//! sync verdicts.

use crate::fixtures::TestItem;
use proptest::prelude::*;
use synccache_core::{BoxError, SyncAction};

/// Strategy for generating item identities from a small alphabet, so that
/// generated operations collide often.
pub fn id_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-h]").expect("Invalid regex")
}

/// Strategy for generating test items.
pub fn test_item_strategy() -> impl Strategy<Value = TestItem> {
    (id_strategy(), 0u64..100).prop_map(|(id, version)| TestItem::new(id, version))
}

/// A caller operation against the cache.
#[derive(Debug, Clone)]
pub enum CacheOp {
    /// Find-or-insert an item.
    GetOrCreate(TestItem),
    /// Read an identity.
    Get(String),
}

/// Strategy for generating caller operations.
pub fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        3 => test_item_strategy().prop_map(CacheOp::GetOrCreate),
        2 => id_strategy().prop_map(CacheOp::Get),
    ]
}

/// Strategy for generating a sequence of caller operations.
pub fn cache_op_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<CacheOp>> {
    prop::collection::vec(cache_op_strategy(), min_ops..max_ops)
}

/// A verdict a scripted sync callback gives in one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedVerdict {
    /// Answer [`SyncAction::Unchanged`].
    Unchanged,
    /// Answer [`SyncAction::Update`] with the next version.
    Bump,
    /// Answer [`SyncAction::Delete`].
    Delete,
    /// Fail.
    Fail,
}

impl ScriptedVerdict {
    /// Produces the callback result for `item`.
    pub fn apply(self, item: &TestItem) -> Result<SyncAction<TestItem>, BoxError> {
        match self {
            ScriptedVerdict::Unchanged => Ok(SyncAction::Unchanged),
            ScriptedVerdict::Bump => Ok(SyncAction::Update(item.bumped())),
            ScriptedVerdict::Delete => Ok(SyncAction::Delete),
            ScriptedVerdict::Fail => Err(format!("scripted failure for {}", item.id).into()),
        }
    }
}

/// Strategy for generating verdicts. Failures dominate so that retry
/// thresholds are reached.
pub fn verdict_strategy() -> impl Strategy<Value = ScriptedVerdict> {
    prop_oneof![
        4 => Just(ScriptedVerdict::Fail),
        2 => Just(ScriptedVerdict::Unchanged),
        2 => Just(ScriptedVerdict::Bump),
        1 => Just(ScriptedVerdict::Delete),
    ]
}

/// Strategy for generating one verdict per cycle.
pub fn verdict_script_strategy(max_cycles: usize) -> impl Strategy<Value = Vec<ScriptedVerdict>> {
    prop::collection::vec(verdict_strategy(), 1..max_cycles)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
