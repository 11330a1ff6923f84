//! Tests for the process-wide display slot.
//!
//! The slot is shared by every test in this binary, so everything runs in a
//! single test function.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use horizon_inspector::Display;
use horizon_inspector::headless::HeadlessBackend;

static INIT_CALLS: AtomicUsize = AtomicUsize::new(0);

fn init() -> horizon_inspector::Result<Display> {
    INIT_CALLS.fetch_add(1, Ordering::SeqCst);
    Display::new(HeadlessBackend::new())
}

#[test]
fn global_display_lifecycle() {
    assert!(Display::global().is_none());

    const THREADS: usize = 8;
    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                Display::get_or_init(init).unwrap()
            })
        })
        .collect();
    let displays: Vec<Arc<Display>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(INIT_CALLS.load(Ordering::SeqCst), 1);
    for display in &displays {
        assert!(Arc::ptr_eq(display, &displays[0]));
    }
    assert!(Arc::ptr_eq(&Display::global().unwrap(), &displays[0]));

    let released = Display::release_global().unwrap();
    assert!(Arc::ptr_eq(&released, &displays[0]));
    assert!(Display::global().is_none());
    drop(displays);
    drop(released);

    // a fresh display after release
    let again = Display::get_or_init(init).unwrap();
    assert_eq!(INIT_CALLS.load(Ordering::SeqCst), 2);
    assert!(Display::release_global().is_some());
    drop(again);
}
