//! Tests for the lazy window bootstrap and display teardown.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use horizon_inspector::headless::{BootstrapStage, HeadlessBackend};
use horizon_inspector::{Display, DisplayBuilder, DisplayState, MainWindow};
use horizon_inspector_core::scene::Shape;

fn fast_builder() -> DisplayBuilder {
    DisplayBuilder::new()
        .poll_interval(Duration::from_millis(1))
        .close_poll_interval(Duration::from_millis(5))
        .shutdown_poll(Duration::from_millis(5))
}

#[test]
fn concurrent_adds_bootstrap_once() {
    const THREADS: usize = 8;
    let backend = HeadlessBackend::new();
    let display = Arc::new(fast_builder().build(backend.clone()).unwrap());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let display = display.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                let name = format!("Threads::T{i}");
                let ok = display.add(&name, Shape::new_ref("n"));
                // a successful add implies the whole window existed already
                let tree = display.tree().expect("tree exists after a successful add");
                assert!(tree.find(&name).is_some());
                assert!(display.running());
                ok
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }

    let stats = backend.stats();
    assert_eq!(stats.contexts_created(), 1);
    assert_eq!(stats.windows_created(), 1);
    assert_eq!(stats.widgets_created(), 1);
    assert_eq!(display.state(), DisplayState::Ready);

    let tree = display.tree().unwrap();
    assert_eq!(tree.children(tree.find("Threads").unwrap()).len(), THREADS);
}

#[test]
fn concurrent_adds_all_fail_without_window() {
    const THREADS: usize = 6;
    let backend = HeadlessBackend::new();
    backend.set_failure(Some(BootstrapStage::Window));
    let display = Arc::new(fast_builder().build(backend.clone()).unwrap());
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let display = display.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                display.add(&format!("T{i}"), Shape::new_ref("n"))
            })
        })
        .collect();

    for handle in handles {
        assert!(!handle.join().unwrap());
    }
    assert_eq!(backend.stats().windows_created(), 0);
    assert!(display.tree().is_none());
    assert!(!display.running());
}

#[test]
fn failed_bootstrap_can_be_retried() {
    let backend = HeadlessBackend::new();
    backend.set_failure(Some(BootstrapStage::Context));
    let display = fast_builder().build(backend.clone()).unwrap();

    assert!(!display.add("A", Shape::new_ref("a")));
    assert!(!display.add_key_handler('k', |_| true, "key"));
    assert!(!display.lock());

    backend.set_failure(None);
    assert!(display.add("A", Shape::new_ref("a")));
    assert_eq!(backend.stats().windows_created(), 1);
}

#[test]
fn widget_failure_closes_partial_window() {
    let backend = HeadlessBackend::new();
    backend.set_failure(Some(BootstrapStage::Widget));
    let display = fast_builder().build(backend.clone()).unwrap();

    assert!(!display.add("A", Shape::new_ref("a")));
    let window = backend.window().unwrap();
    assert!(!window.is_visible());
}

#[test]
fn drop_before_any_add_terminates() {
    let start = Instant::now();
    let display = fast_builder().build(HeadlessBackend::new()).unwrap();
    assert_eq!(display.state(), DisplayState::Uninitialized);
    drop(display);
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[test]
fn drop_with_default_config_terminates() {
    let start = Instant::now();
    let backend = HeadlessBackend::new();
    let display = Display::new(backend.clone()).unwrap();
    drop(display);
    assert!(start.elapsed() < Duration::from_secs(2));
    assert_eq!(backend.stats().windows_created(), 0);
    assert_eq!(backend.stats().exit_requests(), 1);
}

#[test]
fn drop_after_failed_bootstrap_terminates() {
    let backend = HeadlessBackend::new();
    backend.set_failure(Some(BootstrapStage::Window));
    let display = fast_builder().build(backend).unwrap();
    assert!(!display.add("A", Shape::new_ref("a")));

    let start = Instant::now();
    drop(display);
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[test]
fn create_callbacks_run_before_add_returns() {
    let display = fast_builder().build(HeadlessBackend::new()).unwrap();
    let created = Arc::new(AtomicUsize::new(0));
    let c = created.clone();
    let options = horizon_inspector::AddOptions::new().on_create(move |_| {
        c.fetch_add(1, Ordering::SeqCst);
    });

    assert!(display.add_with("A::B::C", Shape::new_ref("c"), options));
    assert_eq!(created.load(Ordering::SeqCst), 3);
}
