use super::*;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
}

#[test]
fn test_fires_once() {
    let rt = runtime();
    let timer = CycleTimer::new(rt.handle().clone());
    let fired = Arc::new(AtomicUsize::new(0));

    let counter = fired.clone();
    let handle = timer.schedule_after(Duration::from_millis(20), move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    std::thread::sleep(Duration::from_millis(150));
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!(!handle.is_cancelled());
}

#[test]
fn test_cancel_before_deadline() {
    let rt = runtime();
    let timer = CycleTimer::new(rt.handle().clone());
    let fired = Arc::new(AtomicUsize::new(0));

    let counter = fired.clone();
    let handle = timer.schedule_after(Duration::from_millis(50), move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    handle.cancel();

    std::thread::sleep(Duration::from_millis(120));
    assert_eq!(fired.load(Ordering::SeqCst), 0);
    assert!(handle.is_cancelled());
}

#[test]
fn test_drop_cancels() {
    let rt = runtime();
    let timer = CycleTimer::new(rt.handle().clone());
    let fired = Arc::new(AtomicUsize::new(0));

    let counter = fired.clone();
    drop(timer.schedule_after(Duration::from_millis(30), move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[test]
fn test_past_deadline_fires_immediately() {
    let rt = runtime();
    let timer = CycleTimer::new(rt.handle().clone());
    let fired = Arc::new(AtomicUsize::new(0));

    let counter = fired.clone();
    let _handle = timer.schedule_at(Instant::now() - Duration::from_millis(10), move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    std::thread::sleep(Duration::from_millis(60));
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn test_current_outside_runtime() {
    assert!(CycleTimer::current().is_none());
    let rt = runtime();
    let _guard = rt.enter();
    assert!(CycleTimer::current().is_some());
}
