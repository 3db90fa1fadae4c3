//! Recording sync callbacks.
//!
//! [`RecordingSync`] wraps a verdict function and logs every invocation so
//! tests can assert on call counts, visit order and concurrency. Clones
//! share the same log, so one clone can be handed to the cache while the
//! test keeps another.

use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use synccache_core::{BoxError, CacheItem, SyncAction, SyncContext, SyncFunction};

type Verdict<T> = dyn Fn(&SyncContext, &T) -> Result<SyncAction<T>, BoxError> + Send + Sync;

/// A sync callback that records every call.
pub struct RecordingSync<T> {
    verdict: Arc<Verdict<T>>,
    log: Arc<CallLog>,
    gate: Option<Arc<Gate>>,
    delay: Option<Duration>,
}

#[derive(Debug, Default)]
struct CallLog {
    calls: Mutex<HashMap<String, u64>>,
    visits: Mutex<Vec<(u64, String)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl<T: CacheItem> RecordingSync<T> {
    /// Creates a recorder around `verdict`.
    pub fn new<F>(verdict: F) -> Self
    where
        F: Fn(&SyncContext, &T) -> Result<SyncAction<T>, BoxError> + Send + Sync + 'static,
    {
        Self {
            verdict: Arc::new(verdict),
            log: Arc::new(CallLog::default()),
            gate: None,
            delay: None,
        }
    }

    /// A recorder that always answers [`SyncAction::Unchanged`].
    pub fn unchanged() -> Self {
        Self::new(|_, _| Ok(SyncAction::Unchanged))
    }

    /// A recorder that always answers [`SyncAction::Delete`].
    pub fn deleting() -> Self {
        Self::new(|_, _| Ok(SyncAction::Delete))
    }

    /// A recorder that always fails, with a message naming the cycle.
    pub fn failing() -> Self {
        Self::new(|ctx, item| {
            Err(format!("sync of {} failed in cycle {}", item.id(), ctx.cycle()).into())
        })
    }

    /// Blocks every call on `gate` before answering.
    #[must_use]
    pub fn with_gate(mut self, gate: Arc<Gate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Sleeps for `delay` in every call before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns how many times `id` was synced.
    pub fn calls_for(&self, id: &str) -> u64 {
        self.log.calls.lock().get(id).copied().unwrap_or(0)
    }

    /// Returns the total number of calls.
    pub fn total_calls(&self) -> u64 {
        self.log.calls.lock().values().sum()
    }

    /// Returns the identities visited in `cycle`, in visit order.
    pub fn visits_in_cycle(&self, cycle: u64) -> Vec<String> {
        self.log
            .visits
            .lock()
            .iter()
            .filter(|(c, _)| *c == cycle)
            .map(|(_, id)| id.clone())
            .collect()
    }

    /// Returns the highest number of calls that were ever running at once.
    pub fn max_in_flight(&self) -> usize {
        self.log.max_in_flight.load(Ordering::SeqCst)
    }
}

impl<T> Clone for RecordingSync<T> {
    fn clone(&self) -> Self {
        Self {
            verdict: Arc::clone(&self.verdict),
            log: Arc::clone(&self.log),
            gate: self.gate.clone(),
            delay: self.delay,
        }
    }
}

impl<T: CacheItem> SyncFunction<T> for RecordingSync<T> {
    fn sync(&self, ctx: &SyncContext, item: &T) -> Result<SyncAction<T>, BoxError> {
        let running = self.log.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.log.max_in_flight.fetch_max(running, Ordering::SeqCst);

        *self
            .log
            .calls
            .lock()
            .entry(item.id().to_owned())
            .or_insert(0) += 1;
        self.log
            .visits
            .lock()
            .push((ctx.cycle(), item.id().to_owned()));

        if let Some(gate) = &self.gate {
            gate.pass();
        }
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }

        let verdict = (self.verdict)(ctx, item);
        self.log.in_flight.fetch_sub(1, Ordering::SeqCst);
        verdict
    }
}

/// A latch that holds callers until the test opens it.
///
/// Callers block in [`pass`](Self::pass); the test observes how many have
/// arrived with [`wait_for_arrivals`](Self::wait_for_arrivals) and lets them
/// through with [`open`](Self::open).
#[derive(Debug, Default)]
pub struct Gate {
    state: Mutex<GateState>,
    changed: Condvar,
}

#[derive(Debug, Default)]
struct GateState {
    open: bool,
    arrivals: usize,
}

impl Gate {
    /// Creates a closed gate.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Records an arrival and blocks until the gate is open.
    pub fn pass(&self) {
        let mut state = self.state.lock();
        state.arrivals += 1;
        self.changed.notify_all();
        while !state.open {
            self.changed.wait(&mut state);
        }
    }

    /// Opens the gate, releasing current and future callers.
    pub fn open(&self) {
        let mut state = self.state.lock();
        state.open = true;
        self.changed.notify_all();
    }

    /// Returns the number of arrivals so far.
    pub fn arrivals(&self) -> usize {
        self.state.lock().arrivals
    }

    /// Blocks until at least `count` callers have arrived or `timeout` passes.
    ///
    /// Returns true if the arrivals were observed.
    pub fn wait_for_arrivals(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while state.arrivals < count {
            if self.changed.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        state.arrivals >= count
    }
}
