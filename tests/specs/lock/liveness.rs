//! Liveness specs
//!
//! A waiter must get the lock soon after the holder lets go, without
//! polling for the whole budget.

use crate::prelude::*;

#[test]
fn waiter_acquires_after_release() {
    let kv = MemoryKvStore::new();
    let mut a = lock(&kv, "lockA", "A");
    assert!(a.acquire(&FakeActivityLog::new(), Duration::from_secs(5)).unwrap());

    let waiter = {
        let kv = kv.clone();
        thread::spawn(move || {
            let mut b = lock(&kv, "lockA", "B");
            let start = Instant::now();
            let acquired = b.acquire(&FakeActivityLog::new(), Duration::from_secs(30)).unwrap();
            let waited = start.elapsed();
            b.release().unwrap();
            (acquired, waited)
        })
    };

    thread::sleep(Duration::from_millis(100));
    a.release().unwrap();

    let (acquired, waited) = waiter.join().unwrap();
    assert!(acquired);
    assert!(waited < Duration::from_secs(5), "waited {:?}", waited);
}

#[test]
fn waiter_acquires_after_force_break() {
    let kv = MemoryKvStore::new();
    leave_crashed_holder(&kv);

    let waiter = {
        let kv = kv.clone();
        thread::spawn(move || {
            let mut b = lock(&kv, "lockA", "B");
            b.acquire(&FakeActivityLog::new(), Duration::from_secs(30)).unwrap()
        })
    };

    thread::sleep(Duration::from_millis(50));
    lock(&kv, "lockA", "operator").force_break().unwrap();

    assert!(waiter.join().unwrap());
    assert_eq!(kv.value("lockA").as_deref(), Some("B"));
}

#[test]
fn released_lock_is_immediately_available() {
    let kv = MemoryKvStore::new();
    let log = FakeActivityLog::new();
    let mut a = lock(&kv, "lockA", "A");
    let mut b = lock(&kv, "lockA", "B");

    for _ in 0..3 {
        assert!(a.acquire(&log, Duration::from_secs(5)).unwrap());
        a.release().unwrap();
        assert!(b.acquire(&log, Duration::from_secs(5)).unwrap());
        b.release().unwrap();
    }
    assert!(log.entries().is_empty());
}

fn leave_crashed_holder(kv: &MemoryKvStore) {
    let mut crashed = lock(kv, "lockA", "crashed");
    assert!(crashed.acquire(&FakeActivityLog::new(), Duration::from_secs(1)).unwrap());
    // Dropped while held: the key keeps naming a holder that is gone
    drop(crashed);
}
