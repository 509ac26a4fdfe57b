//! Shared helpers for the behavioral specs

#![allow(dead_code)]

pub use kvsync_adapters::{MemoryKvStore, TracedKvStore, TracingActivityLog};
pub use kvsync_core::{
    ActivityLog, ConfigPayload, FakeActivityLog, HolderId, LockError, PseudoLock, Severity,
    StoreOutcome, StoreSettings, Version, VersionedConfigStore, SENTINEL,
};
pub use std::sync::{Arc, Barrier};
pub use std::thread;
pub use std::time::{Duration, Instant};

/// Slack allowed on top of a wait budget before a call counts as late
pub const EPSILON: Duration = Duration::from_millis(500);

pub fn lock(kv: &MemoryKvStore, key: &str, holder: &str) -> PseudoLock<MemoryKvStore> {
    PseudoLock::new(kv.clone(), key, HolderId::new(holder)).unwrap()
}

pub fn config_store(
    kv: &MemoryKvStore,
    holder: &str,
    lock_wait: Duration,
) -> VersionedConfigStore<MemoryKvStore> {
    let settings = StoreSettings::new("specs")
        .with_holder(holder)
        .with_lock_wait(lock_wait)
        .with_retry_delay(Duration::from_millis(5));
    VersionedConfigStore::new(kv.clone(), &settings, Arc::new(TracingActivityLog)).unwrap()
}

pub fn payload(text: &str) -> ConfigPayload {
    ConfigPayload::parse(text)
}
