//! Mutual exclusion specs
//!
//! Many holders hammer one key; the critical section must never be
//! entered twice at once.

use crate::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[test]
fn concurrent_holders_never_overlap() {
    const THREADS: usize = 8;
    const ROUNDS: usize = 10;

    let kv = MemoryKvStore::new();
    let inside = Arc::new(AtomicBool::new(false));
    let entered = Arc::new(AtomicUsize::new(0));
    let start = Arc::new(Barrier::new(THREADS));

    let workers: Vec<_> = (0..THREADS)
        .map(|i| {
            let kv = kv.clone();
            let inside = Arc::clone(&inside);
            let entered = Arc::clone(&entered);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                let log = FakeActivityLog::new();
                let mut lock = lock(&kv, "exclusion", &format!("host{}", i));
                start.wait();
                for _ in 0..ROUNDS {
                    assert!(lock.acquire(&log, Duration::from_secs(30)).unwrap());
                    assert!(
                        inside
                            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                            .is_ok(),
                        "two holders inside the critical section"
                    );
                    entered.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(1));
                    inside.store(false, Ordering::SeqCst);
                    lock.release().unwrap();
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(entered.load(Ordering::SeqCst), THREADS * ROUNDS);
    assert_eq!(kv.value("exclusion").as_deref(), Some(SENTINEL));
}

#[test]
fn traced_store_keeps_exclusion() {
    const THREADS: usize = 4;

    let kv = TracedKvStore::new(MemoryKvStore::new());
    let inside = Arc::new(AtomicBool::new(false));

    let workers: Vec<_> = (0..THREADS)
        .map(|i| {
            let kv = kv.clone();
            let inside = Arc::clone(&inside);
            thread::spawn(move || {
                let mut lock =
                    PseudoLock::new(kv, "traced", HolderId::new(format!("host{}", i))).unwrap();
                for _ in 0..5 {
                    assert!(lock
                        .acquire(&TracingActivityLog, Duration::from_secs(30))
                        .unwrap());
                    assert!(!inside.swap(true, Ordering::SeqCst));
                    inside.store(false, Ordering::SeqCst);
                    lock.release().unwrap();
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }
}

#[test]
fn acquire_while_holding_is_an_error() {
    let kv = MemoryKvStore::new();
    let log = FakeActivityLog::new();
    let mut a = lock(&kv, "lockA", "A");

    assert!(a.acquire(&log, Duration::from_secs(5)).unwrap());
    let err = a.acquire(&log, Duration::from_secs(5)).unwrap_err();

    assert!(matches!(err, LockError::AlreadyHeld { .. }));
    assert!(a.is_held());
    assert!(log.entries().is_empty());
}
