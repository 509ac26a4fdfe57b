//! Optimistic concurrency specs
//!
//! Writers racing on the same version: exactly one wins, the other sees
//! the winner on its next load.

use crate::prelude::*;

#[test]
fn racing_writers_on_same_version_one_wins() {
    let kv = MemoryKvStore::new();
    let stores: Vec<_> = ["p1", "p2"]
        .iter()
        .map(|holder| Arc::new(config_store(&kv, holder, Duration::from_secs(10))))
        .collect();
    let base = stores[0].load().unwrap().version();
    let start = Arc::new(Barrier::new(stores.len()));

    let writers: Vec<_> = stores
        .iter()
        .enumerate()
        .map(|(i, store)| {
            let store = Arc::clone(store);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                store.store(&payload(&format!("X={}", i + 1)), base).unwrap()
            })
        })
        .collect();
    let results: Vec<_> = writers.into_iter().map(|w| w.join().unwrap()).collect();

    let winners: Vec<_> = results.iter().flatten().collect();
    assert_eq!(winners.len(), 1, "results: {:?}", results);

    let winner = winners[0];
    for store in &stores {
        assert_eq!(&store.load().unwrap(), winner);
    }
}

#[test]
fn many_threads_sharing_one_store_serialize_updates() {
    const THREADS: usize = 6;

    let kv = MemoryKvStore::new();
    let store = Arc::new(config_store(&kv, "p1", Duration::from_secs(30)));

    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || loop {
                let current = store.load().unwrap();
                let count: u32 = current
                    .payload()
                    .get("count")
                    .map_or(0, |c| c.parse().unwrap());
                let next = current.payload().clone().with("count", (count + 1).to_string());
                if store.store(&next, current.version()).unwrap().is_some() {
                    return;
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }
    let loaded = store.load().unwrap();
    assert_eq!(loaded.payload().get("count"), Some("6"));
    assert_eq!(loaded.version(), Version(THREADS as u64));
}

#[test]
fn two_processes_walkthrough() {
    let kv = MemoryKvStore::new();
    let p1 = config_store(&kv, "p1", Duration::from_secs(10));
    let p2 = config_store(&kv, "p2", Duration::from_secs(10));

    let empty = p1.load().unwrap();
    assert_eq!(empty.version(), Version::ZERO);
    assert!(empty.payload().is_empty());

    let v1 = p1.store(&payload("X=1"), Version::ZERO).unwrap().unwrap();
    assert_eq!(v1.version(), Version(1));

    assert_eq!(p2.store(&payload("X=2"), Version::ZERO).unwrap(), None);

    let seen = p2.load().unwrap();
    assert_eq!(seen.version(), Version(1));
    similar_asserts::assert_eq!(seen.payload().render(), "X=1\n");

    let v2 = p2.store(&payload("X=2"), seen.version()).unwrap().unwrap();
    assert_eq!(v2.version(), Version(2));
}

#[test]
fn read_after_write() {
    let kv = MemoryKvStore::new();
    let store = config_store(&kv, "p1", Duration::from_secs(10));
    let written = payload("# exhibitor\nzoo-cfg-extra=tickTime=2000\nservers-spec=1:a,2:b\n");

    let stored = store.store(&written, Version::ZERO).unwrap().unwrap();
    let loaded = store.load().unwrap();

    assert_eq!(loaded, stored);
    similar_asserts::assert_eq!(
        loaded.payload().render(),
        "servers-spec=1:a,2:b\nzoo-cfg-extra=tickTime=2000\n"
    );
}

#[test]
fn busy_lock_is_told_apart_from_stale_version() {
    let kv = MemoryKvStore::new();
    let store = config_store(&kv, "p1", Duration::from_millis(200));
    let mut outside = store.new_pseudo_lock().unwrap();
    assert!(outside.acquire(&FakeActivityLog::new(), Duration::from_secs(1)).unwrap());

    let start = Instant::now();
    let outcome = store.store_outcome(&payload("X=1"), Version::ZERO).unwrap();
    assert_eq!(outcome, StoreOutcome::LockUnavailable);
    assert!(start.elapsed() < Duration::from_millis(200) + EPSILON);

    outside.release().unwrap();
    store.store(&payload("X=1"), Version::ZERO).unwrap().unwrap();
    assert_eq!(
        store.store_outcome(&payload("X=2"), Version::ZERO).unwrap(),
        StoreOutcome::Stale { current: Version(1) }
    );
}
