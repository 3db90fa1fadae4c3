//! Fixed-interval driver for the sync engine.

use crate::cancel::CancellationToken;
use crate::engine::SyncEngine;
use crate::error::{CacheError, CacheResult};
use crate::item::CacheItem;
use crate::stats::CacheStats;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Name given to scheduler threads.
pub const SCHEDULER_THREAD_NAME: &str = "synccache-resync";

/// Runs a sync cycle once per resync period until cancelled.
///
/// The loop is "run a cycle, wait for the next tick or cancellation,
/// repeat". Each cycle runs synchronously on the loop's thread, so cycles
/// from one scheduler never overlap. When a cycle overruns the period, the
/// ticks that fell due meanwhile collapse into a single immediate tick.
pub struct Scheduler<T: CacheItem> {
    engine: Arc<SyncEngine<T>>,
    period: Duration,
    stats: Arc<CacheStats>,
}

impl<T: CacheItem> Scheduler<T> {
    pub(crate) fn new(
        engine: Arc<SyncEngine<T>>,
        period: Duration,
        stats: Arc<CacheStats>,
    ) -> Self {
        Self {
            engine,
            period,
            stats,
        }
    }

    /// Returns the resync period.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Runs the loop on a new background thread.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::SchedulerSpawn`] if the thread cannot be created.
    pub fn spawn(self, token: CancellationToken) -> CacheResult<SchedulerHandle> {
        let loop_token = token.clone();
        let thread = thread::Builder::new()
            .name(SCHEDULER_THREAD_NAME.into())
            .spawn(move || self.run(&loop_token))
            .map_err(CacheError::SchedulerSpawn)?;

        Ok(SchedulerHandle { token, thread })
    }

    /// Runs the loop on the current thread until `token` is cancelled.
    ///
    /// The first cycle starts immediately. Cancellation is checked before
    /// every cycle and interrupts the wait between cycles, but an in-flight
    /// cycle always runs to completion.
    pub fn run(&self, token: &CancellationToken) {
        info!(
            period_ms = self.period.as_millis() as u64,
            "starting resync loop"
        );

        let mut tick = Instant::now();
        loop {
            if token.is_cancelled() {
                break;
            }

            self.engine.run_cycle(token);

            let (next, coalesced) = next_tick(self.period, tick, Instant::now());
            if coalesced > 0 {
                warn!(
                    coalesced,
                    period_ms = self.period.as_millis() as u64,
                    "sync cycle overran resync period, skipping missed ticks"
                );
                self.stats.record_coalesced_ticks(coalesced);
            }

            // Past the end of the clock: no further tick can fall due.
            let Some(next) = next else {
                token.wait();
                break;
            };
            tick = next;

            if token.wait_until(tick) {
                break;
            }
        }

        debug!(
            cycles = self.engine.cycles_started(),
            "resync loop stopped"
        );
    }
}

/// Computes when the tick after `last` should fire, given the time `now`
/// at which the previous cycle finished.
///
/// Ticks fall on `last + k * period`. If one or more ticks are already due,
/// they are served by a single tick at `now`; the returned count is the
/// number of due ticks dropped in the process. Returns `None` for the tick
/// when `last + period` is not representable as an `Instant`.
fn next_tick(period: Duration, last: Instant, now: Instant) -> (Option<Instant>, u64) {
    let Some(scheduled) = last.checked_add(period) else {
        return (None, 0);
    };
    if scheduled > now || period.is_zero() {
        return (Some(scheduled.max(now)), 0);
    }

    let behind = now.duration_since(scheduled);
    let coalesced = behind.as_nanos() / period.as_nanos();
    (Some(now), u64::try_from(coalesced).unwrap_or(u64::MAX))
}

/// Handle to a scheduler running on a background thread.
///
/// Dropping the handle does not stop the scheduler; cancel its token.
#[derive(Debug)]
pub struct SchedulerHandle {
    token: CancellationToken,
    thread: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Returns the token the scheduler is bound to.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Requests the scheduler to stop after its current cycle.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns true once the scheduler thread has exited.
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Waits for the scheduler thread to exit.
    ///
    /// Blocks forever unless the token is cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::SchedulerPanicked`] if the thread panicked,
    /// which happens when the sync callback panics.
    pub fn join(self) -> CacheResult<()> {
        self.thread
            .join()
            .map_err(|_| CacheError::SchedulerPanicked)
    }

    /// Cancels the scheduler and waits for it to exit.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::SchedulerPanicked`] if the thread panicked.
    pub fn shutdown(self) -> CacheResult<()> {
        self.cancel();
        self.join()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: Duration = Duration::from_millis(100);

    #[test]
    fn next_tick_on_schedule() {
        let last = Instant::now();
        let now = last + Duration::from_millis(30);
        assert_eq!(next_tick(PERIOD, last, now), (Some(last + PERIOD), 0));
    }

    #[test]
    fn next_tick_slightly_late_runs_immediately() {
        let last = Instant::now();
        let now = last + Duration::from_millis(150);
        assert_eq!(next_tick(PERIOD, last, now), (Some(now), 0));
    }

    #[test]
    fn next_tick_coalesces_missed_ticks() {
        let last = Instant::now();
        let now = last + Duration::from_millis(350);
        // Ticks at 100, 200 and 300 were due; one fires now, two are dropped.
        assert_eq!(next_tick(PERIOD, last, now), (Some(now), 2));
    }

    #[test]
    fn next_tick_exactly_due() {
        let last = Instant::now();
        let now = last + PERIOD;
        assert_eq!(next_tick(PERIOD, last, now), (Some(now), 0));
    }

    #[test]
    fn next_tick_past_end_of_clock() {
        let last = Instant::now();
        assert_eq!(next_tick(Duration::MAX, last, last), (None, 0));
    }
}
