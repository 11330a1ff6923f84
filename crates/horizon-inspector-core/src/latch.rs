//! Two-state readiness latch.
//!
//! A [`ReadinessLatch`] starts *pending* and can be *opened* exactly once with
//! a value. Every waiter, whether it arrived before or after the latch was
//! opened, observes that same value. This gives a direct happens-before edge
//! between the thread that opens the latch and every thread that returns from
//! [`wait`](ReadinessLatch::wait).

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

/// A one-shot latch carrying an outcome value.
#[derive(Debug)]
pub struct ReadinessLatch<T> {
    outcome: Mutex<Option<T>>,
    opened: Condvar,
}

impl<T: Clone> ReadinessLatch<T> {
    /// Create a pending latch.
    pub fn new() -> Self {
        Self {
            outcome: Mutex::new(None),
            opened: Condvar::new(),
        }
    }

    /// Open the latch with `value`, waking every waiter.
    ///
    /// Returns `false` if the latch was already open; the original value is
    /// kept in that case.
    pub fn open(&self, value: T) -> bool {
        let mut outcome = self.outcome.lock();
        if outcome.is_some() {
            return false;
        }
        *outcome = Some(value);
        drop(outcome);
        self.opened.notify_all();
        true
    }

    /// Whether the latch has been opened.
    pub fn is_open(&self) -> bool {
        self.outcome.lock().is_some()
    }

    /// The outcome, if the latch is open.
    pub fn peek(&self) -> Option<T> {
        self.outcome.lock().clone()
    }

    /// Block until the latch opens and return its outcome.
    ///
    /// Spurious wakeups are absorbed by re-checking the state.
    pub fn wait(&self) -> T {
        let mut outcome = self.outcome.lock();
        loop {
            if let Some(value) = outcome.as_ref() {
                return value.clone();
            }
            self.opened.wait(&mut outcome);
        }
    }

    /// Block until the latch opens or `timeout` elapses.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut outcome = self.outcome.lock();
        loop {
            if let Some(value) = outcome.as_ref() {
                return Some(value.clone());
            }
            if self.opened.wait_until(&mut outcome, deadline).timed_out() {
                return outcome.clone();
            }
        }
    }
}

impl<T: Clone> Default for ReadinessLatch<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_latch_opens_once() {
        let latch = ReadinessLatch::new();
        assert!(!latch.is_open());
        assert!(latch.open(1));
        assert!(!latch.open(2));
        assert_eq!(latch.peek(), Some(1));
        assert_eq!(latch.wait(), 1);
    }

    #[test]
    fn test_waiters_released_by_open() {
        let latch = Arc::new(ReadinessLatch::<&'static str>::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let latch = latch.clone();
                thread::spawn(move || latch.wait())
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        latch.open("ready");

        for handle in handles {
            assert_eq!(handle.join().unwrap(), "ready");
        }
    }

    #[test]
    fn test_wait_timeout_on_pending_latch() {
        let latch = ReadinessLatch::<u8>::new();
        assert_eq!(latch.wait_timeout(Duration::from_millis(10)), None);
        latch.open(7);
        assert_eq!(latch.wait_timeout(Duration::from_millis(10)), Some(7));
    }
}
