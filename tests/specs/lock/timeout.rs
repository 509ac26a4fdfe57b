//! Timeout specs
//!
//! A contended acquire gives up close to its budget and reports the
//! failure to the activity log exactly once.

use crate::prelude::*;
use kvsync_core::{KvStore, Precondition};

#[test]
fn contended_acquire_returns_false_near_budget() {
    let kv = MemoryKvStore::new();
    let mut a = lock(&kv, "lockA", "A");
    assert!(a.acquire(&FakeActivityLog::new(), Duration::from_secs(5)).unwrap());

    let log = FakeActivityLog::new();
    let mut b = lock(&kv, "lockA", "B");
    let budget = Duration::from_millis(300);
    let start = Instant::now();

    assert!(!b.acquire(&log, budget).unwrap());
    let elapsed = start.elapsed();
    assert!(elapsed >= budget, "gave up early after {:?}", elapsed);
    assert!(elapsed < budget + EPSILON, "gave up late after {:?}", elapsed);

    let errors = log.with_severity(Severity::Error);
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].message,
        "Could not acquire lock within 300 ms, key: lockA"
    );
    a.release().unwrap();
}

#[test]
fn zero_budget_gives_up_at_once() {
    let kv = MemoryKvStore::new();
    let log = FakeActivityLog::new();
    let mut b = lock(&kv, "lockA", "B");
    let start = Instant::now();

    assert!(!b.acquire(&log, Duration::ZERO).unwrap());
    assert!(start.elapsed() < EPSILON);
    assert_eq!(kv.value("lockA"), None);
    assert_eq!(log.entries().len(), 1);
}

#[test]
fn hand_off_between_two_holders() {
    let kv = MemoryKvStore::new();
    kv.put("lockA", SENTINEL, Precondition::None).unwrap();
    let log = FakeActivityLog::new();
    let mut a = lock(&kv, "lockA", "A");
    let mut b = lock(&kv, "lockA", "B");

    assert!(a.acquire(&log, Duration::from_secs(5)).unwrap());
    assert!(!b.acquire(&log, Duration::from_secs(1)).unwrap());
    assert_eq!(log.entries().len(), 1);
    assert!(log.entries()[0].message.contains("lockA"));

    a.release().unwrap();
    assert!(b.acquire(&log, Duration::from_secs(30)).unwrap());
    assert_eq!(kv.value("lockA").as_deref(), Some("B"));
    b.release().unwrap();
}
