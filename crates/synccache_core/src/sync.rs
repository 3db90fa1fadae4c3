//! The synchronization callback contract.

use crate::cancel::CancellationToken;
use crate::item::BoxError;

/// What the cache should do with an item after it has been synced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction<T> {
    /// Leave the stored item and its bookkeeping untouched.
    Unchanged,
    /// Replace the stored item and clear its failure streak.
    Update(T),
    /// Remove the item from the cache.
    Delete,
}

impl<T> SyncAction<T> {
    /// Returns a short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            SyncAction::Unchanged => "unchanged",
            SyncAction::Update(_) => "update",
            SyncAction::Delete => "delete",
        }
    }
}

/// Per-cycle context handed to the sync callback.
#[derive(Debug, Clone)]
pub struct SyncContext {
    cycle: u64,
    token: CancellationToken,
}

impl SyncContext {
    /// Creates a context for the given cycle.
    pub fn new(cycle: u64, token: CancellationToken) -> Self {
        Self { cycle, token }
    }

    /// Returns the 1-based number of the cycle this call belongs to.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Returns true if the scheduler driving this cycle has been cancelled.
    ///
    /// The cycle itself always runs to completion; long-running callbacks
    /// may check this to return early.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns the cancellation token of the driving scheduler.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

/// Re-evaluates one cached item.
///
/// Called once per item per cycle, sequentially, from the scheduler
/// thread. Implementations must tolerate being called repeatedly for the
/// same logical item. An `Err` is recorded against the item and retried on
/// the next cycle until the retry threshold is exceeded.
///
/// Any `Fn(&SyncContext, &T) -> Result<SyncAction<T>, BoxError>` closure
/// implements this trait.
pub trait SyncFunction<T>: Send + Sync {
    /// Returns the verdict for `item`.
    fn sync(&self, ctx: &SyncContext, item: &T) -> Result<SyncAction<T>, BoxError>;
}

impl<T, F> SyncFunction<T> for F
where
    F: Fn(&SyncContext, &T) -> Result<SyncAction<T>, BoxError> + Send + Sync,
{
    fn sync(&self, ctx: &SyncContext, item: &T) -> Result<SyncAction<T>, BoxError> {
        self(ctx, item)
    }
}
