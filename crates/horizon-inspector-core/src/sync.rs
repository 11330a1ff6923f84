//! Re-entrant access locks with split lock/unlock calls.
//!
//! [`AccessLock`] guards a resource that is shared between application threads
//! and the background UI thread, such as the scene graph owned by a render
//! widget or the widget tree owned by a main window.
//!
//! Unlike a `Mutex<T>`, the lock does not own the data it protects. It exists
//! so that callers can bracket arbitrary multi-step work with explicit
//! `lock()`/`unlock()` calls (for example an application thread that edits a
//! scene graph across several function calls) while still offering RAII
//! guards for scoped use.
//!
//! The lock is re-entrant: the owning thread may acquire it again, and must
//! release it the same number of times.
//!
//! # Example
//!
//! ```
//! use horizon_inspector_core::sync::AccessLock;
//!
//! let lock = AccessLock::new("scene");
//!
//! // Scoped access.
//! {
//!     let _guard = lock.guard();
//!     assert!(lock.is_held_by_current_thread());
//! }
//!
//! // Split access.
//! lock.lock();
//! assert!(lock.unlock());
//! assert!(!lock.unlock());
//! ```

use std::marker::PhantomData;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::logging::targets;

#[derive(Debug, Default)]
struct LockState {
    owner: Option<ThreadId>,
    depth: usize,
}

/// A re-entrant lock that can be held across function boundaries.
#[derive(Debug)]
pub struct AccessLock {
    name: &'static str,
    state: Mutex<LockState>,
    released: Condvar,
}

impl AccessLock {
    /// Create a new, unlocked access lock.
    ///
    /// The name only appears in trace output.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Mutex::new(LockState::default()),
            released: Condvar::new(),
        }
    }

    /// The name given at construction.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Block until the lock is held by the current thread.
    pub fn lock(&self) {
        let me = thread::current().id();
        let mut state = self.state.lock();
        loop {
            match state.owner {
                None => {
                    state.owner = Some(me);
                    state.depth = 1;
                    return;
                }
                Some(owner) if owner == me => {
                    state.depth += 1;
                    return;
                }
                Some(_) => self.released.wait(&mut state),
            }
        }
    }

    /// Try to acquire the lock without blocking.
    ///
    /// Returns `true` if the current thread now holds the lock.
    pub fn try_lock(&self) -> bool {
        let me = thread::current().id();
        let mut state = self.state.lock();
        match state.owner {
            None => {
                state.owner = Some(me);
                state.depth = 1;
                true
            }
            Some(owner) if owner == me => {
                state.depth += 1;
                true
            }
            Some(_) => false,
        }
    }

    /// Try to acquire the lock, waiting at most `timeout`.
    pub fn try_lock_for(&self, timeout: Duration) -> bool {
        let me = thread::current().id();
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            match state.owner {
                None => {
                    state.owner = Some(me);
                    state.depth = 1;
                    return true;
                }
                Some(owner) if owner == me => {
                    state.depth += 1;
                    return true;
                }
                Some(_) => {
                    if self.released.wait_until(&mut state, deadline).timed_out() {
                        return false;
                    }
                }
            }
        }
    }

    /// Release one level of the lock.
    ///
    /// Returns `false` (and changes nothing) if the current thread does not
    /// hold the lock.
    pub fn unlock(&self) -> bool {
        let me = thread::current().id();
        let mut state = self.state.lock();
        if state.owner != Some(me) {
            tracing::trace!(target: targets::SYNC, lock = self.name, "unlock from non-owner ignored");
            return false;
        }
        state.depth -= 1;
        if state.depth == 0 {
            state.owner = None;
            drop(state);
            self.released.notify_one();
        }
        true
    }

    /// Acquire the lock and return a guard that releases it on drop.
    pub fn guard(&self) -> AccessGuard<'_> {
        self.lock();
        AccessGuard {
            lock: self,
            _not_send: PhantomData,
        }
    }

    /// Non-blocking variant of [`guard`](Self::guard).
    pub fn try_guard(&self) -> Option<AccessGuard<'_>> {
        self.try_lock().then(|| AccessGuard {
            lock: self,
            _not_send: PhantomData,
        })
    }

    /// Whether any thread currently holds the lock.
    pub fn is_locked(&self) -> bool {
        self.state.lock().owner.is_some()
    }

    /// Whether the calling thread currently holds the lock.
    pub fn is_held_by_current_thread(&self) -> bool {
        self.state.lock().owner == Some(thread::current().id())
    }
}

/// RAII guard for an [`AccessLock`].
///
/// Guards are tied to the thread that created them, so they are not `Send`.
/// Functions that must only run while the lock is held can take
/// `&AccessGuard<'_>` as proof of acquisition.
#[must_use = "the lock is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct AccessGuard<'a> {
    lock: &'a AccessLock,
    _not_send: PhantomData<*const ()>,
}

impl AccessGuard<'_> {
    /// The lock this guard holds.
    pub fn lock(&self) -> &AccessLock {
        self.lock
    }
}

impl Drop for AccessGuard<'_> {
    fn drop(&mut self) {
        self.lock.unlock();
    }
}

static_assertions::assert_impl_all!(AccessLock: Send, Sync);
static_assertions::assert_not_impl_any!(AccessGuard<'static>: Send);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_reentrant_lock_and_unlock() {
        let lock = AccessLock::new("test");
        lock.lock();
        lock.lock();
        assert!(lock.is_held_by_current_thread());
        assert!(lock.unlock());
        assert!(lock.is_locked());
        assert!(lock.unlock());
        assert!(!lock.is_locked());
        assert!(!lock.unlock());
    }

    #[test]
    fn test_try_lock_fails_while_other_thread_holds() {
        let lock = Arc::new(AccessLock::new("test"));
        lock.lock();

        let other = lock.clone();
        let acquired = thread::spawn(move || other.try_lock()).join().unwrap();
        assert!(!acquired);

        assert!(lock.unlock());
        let other = lock.clone();
        let acquired = thread::spawn(move || {
            let ok = other.try_lock();
            other.unlock();
            ok
        })
        .join()
        .unwrap();
        assert!(acquired);
    }

    #[test]
    fn test_unlock_from_other_thread_is_rejected() {
        let lock = Arc::new(AccessLock::new("test"));
        lock.lock();
        let other = lock.clone();
        assert!(!thread::spawn(move || other.unlock()).join().unwrap());
        assert!(lock.is_held_by_current_thread());
        lock.unlock();
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let lock = AccessLock::new("test");
        {
            let guard = lock.guard();
            assert_eq!(guard.lock().name(), "test");
            assert!(lock.is_locked());
        }
        assert!(!lock.is_locked());
    }

    #[test]
    fn test_blocked_lock_wakes_after_release() {
        let lock = Arc::new(AccessLock::new("test"));
        let entered = Arc::new(AtomicBool::new(false));
        lock.lock();

        let (other, flag) = (lock.clone(), entered.clone());
        let handle = thread::spawn(move || {
            let _guard = other.guard();
            flag.store(true, Ordering::SeqCst);
        });

        thread::sleep(Duration::from_millis(50));
        assert!(!entered.load(Ordering::SeqCst));
        lock.unlock();
        handle.join().unwrap();
        assert!(entered.load(Ordering::SeqCst));
    }

    #[test]
    fn test_try_lock_for_times_out() {
        let lock = Arc::new(AccessLock::new("test"));
        lock.lock();
        let other = lock.clone();
        let acquired = thread::spawn(move || other.try_lock_for(Duration::from_millis(20)))
            .join()
            .unwrap();
        assert!(!acquired);
        lock.unlock();
    }
}
