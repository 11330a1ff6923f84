//! Cooperative pause/unpause rendezvous.
//!
//! [`PauseGate::pause`] parks the calling thread until some thread calls
//! [`PauseGate::unpause`]. The gate records no "unpaused" state: an
//! `unpause()` that happens while nobody is paused is lost, and a later
//! `pause()` waits for the next `unpause()`.
//!
//! Internally a generation counter is bumped on every `unpause()`, so a
//! paused thread only returns once the generation it entered with has
//! changed. Spurious condvar wakeups therefore never release a waiter.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::logging::targets;

#[derive(Debug, Default)]
struct GateState {
    generation: u64,
    waiting: usize,
}

/// A non-sticky rendezvous point.
#[derive(Debug, Default)]
pub struct PauseGate {
    state: Mutex<GateState>,
    released: Condvar,
}

impl PauseGate {
    /// Create a gate with nobody waiting.
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the next [`unpause`](Self::unpause).
    pub fn pause(&self) {
        let mut state = self.state.lock();
        let entered = state.generation;
        state.waiting += 1;
        tracing::info!(target: targets::PAUSE, "pausing");
        while state.generation == entered {
            self.released.wait(&mut state);
        }
        state.waiting -= 1;
        tracing::info!(target: targets::PAUSE, "done pausing");
    }

    /// Like [`pause`](Self::pause) but gives up after `timeout`.
    ///
    /// Returns `true` if released by an `unpause()`.
    pub fn pause_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        let entered = state.generation;
        state.waiting += 1;
        let mut released = true;
        while state.generation == entered {
            if self.released.wait_until(&mut state, deadline).timed_out() {
                released = state.generation != entered;
                break;
            }
        }
        state.waiting -= 1;
        released
    }

    /// Wake every thread currently blocked in `pause()`.
    ///
    /// Returns how many threads were waiting.
    pub fn unpause(&self) -> usize {
        let mut state = self.state.lock();
        state.generation = state.generation.wrapping_add(1);
        let waiting = state.waiting;
        drop(state);
        tracing::info!(target: targets::PAUSE, waiting, "calling to unpause");
        self.released.notify_all();
        waiting
    }

    /// Number of threads currently paused.
    pub fn waiting(&self) -> usize {
        self.state.lock().waiting
    }
}
