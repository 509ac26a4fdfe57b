// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process versioned key-value store
//!
//! Shared by cloning. Watches block the calling thread on a condition
//! variable until the watched key's revision moves or the timeout passes,
//! so it can stand in for a networked store in multi-threaded tests.

use kvsync_core::kv::{KvEntry, KvError, KvStore, Precondition, Version};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Default)]
struct Slot {
    value: Option<String>,
    revision: u64,
}

#[derive(Default)]
struct State {
    slots: HashMap<String, Slot>,
    failures: VecDeque<KvError>,
}

impl State {
    fn entry(&self, key: &str) -> Option<KvEntry> {
        let slot = self.slots.get(key)?;
        let value = slot.value.clone()?;
        Some(KvEntry::new(value, Version(slot.revision)))
    }

    fn revision(&self, key: &str) -> Version {
        Version(self.slots.get(key).map_or(0, |s| s.revision))
    }

    fn write(&mut self, key: &str, value: Option<String>) -> Version {
        let slot = self.slots.entry(key.to_string()).or_default();
        slot.revision += 1;
        slot.value = value;
        Version(slot.revision)
    }

    fn injected(&mut self) -> Result<(), KvError> {
        match self.failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
    changed: Condvar,
}

#[derive(Clone, Default)]
pub struct MemoryKvStore {
    shared: Arc<Shared>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.shared.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fail the next call, whatever the operation, with `error`
    pub fn fail_next(&self, error: KvError) {
        self.lock().failures.push_back(error);
    }

    /// Current value of a key without going through the store API
    pub fn value(&self, key: &str) -> Option<String> {
        self.lock().entry(key).map(|e| e.value)
    }

    /// Latest revision of a key, `Version::ZERO` if never written
    pub fn revision(&self, key: &str) -> Version {
        self.lock().revision(key)
    }

    fn commit(&self, state: &mut State, key: &str, value: Option<String>) -> Version {
        let version = state.write(key, value);
        self.shared.changed.notify_all();
        version
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<KvEntry>, KvError> {
        let mut state = self.lock();
        state.injected()?;
        Ok(state.entry(key))
    }

    fn put(&self, key: &str, value: &str, precondition: Precondition) -> Result<Version, KvError> {
        let mut state = self.lock();
        state.injected()?;

        let current = state.entry(key);
        let allowed = match (&precondition, &current) {
            (Precondition::None, _) => Ok(()),
            (Precondition::Absent, None) => Ok(()),
            (Precondition::Absent, Some(_)) => Err(KvError::AlreadyExists(key.to_string())),
            (Precondition::ValueEquals(_), None) => Err(KvError::KeyAbsent(key.to_string())),
            (Precondition::ValueEquals(expected), Some(entry)) if &entry.value == expected => {
                Ok(())
            }
            (Precondition::VersionEquals(expected), _) if state.revision(key) == *expected => {
                Ok(())
            }
            (Precondition::ValueEquals(_), Some(_)) | (Precondition::VersionEquals(_), _) => {
                Err(KvError::PreconditionFailed(key.to_string()))
            }
        };
        allowed?;

        Ok(self.commit(&mut state, key, Some(value.to_string())))
    }

    fn delete(&self, key: &str) -> Result<(), KvError> {
        let mut state = self.lock();
        state.injected()?;
        if state.entry(key).is_none() {
            return Err(KvError::KeyAbsent(key.to_string()));
        }
        self.commit(&mut state, key, None);
        Ok(())
    }

    fn watch(
        &self,
        key: &str,
        since: Version,
        timeout: Duration,
    ) -> Result<Option<KvEntry>, KvError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.lock();
        state.injected()?;

        loop {
            if state.revision(key) != since {
                return Ok(state.entry(key));
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(KvError::TimedOut(key.to_string()));
            }
            let (guard, _) = self
                .shared
                .changed
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(|e| e.into_inner());
            state = guard;
        }
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
