//! Round status shared between the rebuild worker and readers.
//!
//! Every transition happens under one mutex and wakes every waiter on the
//! paired condvar, so readers block on state changes instead of polling.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde::Serialize;

/// Snapshot of the current (or last) rebuild round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RoundState {
    /// Increments on every [`ProgressTracker::reset`]; 0 before the first round.
    pub round: u64,
    pub running: bool,
    /// Set only when the round wrote every batch without being aborted.
    pub completed: bool,
    /// Items committed in this round. Only meaningful for `round`.
    pub processed: usize,
    /// Set once this round was told to stop early; cleared by the next reset.
    pub cancel_requested: bool,
}

impl RoundState {
    /// Whether page `page` of size `page_size` can be read.
    ///
    /// Page 0 is always readable. Later pages need strictly more than
    /// `page * page_size` items committed, unless the round is over.
    pub fn page_ready(&self, page: usize, page_size: usize) -> bool {
        page == 0
            || !self.running
            || self.completed
            || self.processed > page.saturating_mul(page_size)
    }
}

/// Result of a bounded wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Ready(RoundState),
    TimedOut(RoundState),
}

impl WaitOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, WaitOutcome::Ready(_))
    }

    pub fn state(&self) -> RoundState {
        match self {
            WaitOutcome::Ready(state) | WaitOutcome::TimedOut(state) => *state,
        }
    }
}

#[derive(Debug, Default)]
pub struct ProgressTracker {
    state: Mutex<RoundState>,
    changed: Condvar,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new round and return its number.
    pub fn reset(&self) -> u64 {
        let mut state = self.state.lock();
        state.round += 1;
        state.running = true;
        state.completed = false;
        state.processed = 0;
        state.cancel_requested = false;
        let round = state.round;
        drop(state);
        self.changed.notify_all();
        round
    }

    pub fn advance(&self, n: usize) {
        let mut state = self.state.lock();
        state.processed += n;
        drop(state);
        self.changed.notify_all();
    }

    pub fn mark_completed(&self) {
        let mut state = self.state.lock();
        state.completed = true;
        drop(state);
        self.changed.notify_all();
    }

    /// Record that the running round was cancelled. The worker itself only
    /// looks at its cancellation token; this is for observers.
    pub fn request_cancel(&self) {
        let mut state = self.state.lock();
        state.cancel_requested = true;
        drop(state);
        self.changed.notify_all();
    }

    pub fn mark_stopped(&self) {
        let mut state = self.state.lock();
        state.running = false;
        drop(state);
        self.changed.notify_all();
    }

    pub fn snapshot(&self) -> RoundState {
        *self.state.lock()
    }

    /// Block until `predicate` holds, re-checking after every transition.
    pub fn wait_until<F>(&self, mut predicate: F) -> RoundState
    where
        F: FnMut(&RoundState) -> bool,
    {
        let mut state = self.state.lock();
        while !predicate(&state) {
            self.changed.wait(&mut state);
        }
        *state
    }

    /// Like [`wait_until`](Self::wait_until), giving up after `timeout`.
    pub fn wait_until_timeout<F>(&self, timeout: Duration, mut predicate: F) -> WaitOutcome
    where
        F: FnMut(&RoundState) -> bool,
    {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return WaitOutcome::Ready(self.wait_until(predicate));
        };
        let mut state = self.state.lock();
        while !predicate(&state) {
            if self.changed.wait_until(&mut state, deadline).timed_out() {
                return if predicate(&state) {
                    WaitOutcome::Ready(*state)
                } else {
                    WaitOutcome::TimedOut(*state)
                };
            }
        }
        WaitOutcome::Ready(*state)
    }
}

/// Calls [`ProgressTracker::mark_stopped`] when dropped, so the round ends
/// as stopped on success, error, cancellation and panic alike.
pub(crate) struct StopGuard<'a> {
    tracker: &'a ProgressTracker,
}

impl<'a> StopGuard<'a> {
    pub(crate) fn new(tracker: &'a ProgressTracker) -> Self {
        Self { tracker }
    }
}

impl Drop for StopGuard<'_> {
    fn drop(&mut self) {
        self.tracker.mark_stopped();
    }
}
