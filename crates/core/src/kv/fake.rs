// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake key-value store for testing
//!
//! Single-threaded and deterministic: watches never block, they advance a
//! shared [`FakeClock`] instead. Competing writers are simulated by
//! scripting watch outcomes or interference before a call.
#![cfg_attr(coverage_nightly, coverage(off))]

use super::traits::{KvEntry, KvError, KvStore, Precondition, Version};
use crate::clock::FakeClock;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Kind of store operation, used to target injected behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KvOp {
    Get,
    Put,
    Delete,
    Watch,
}

/// Recorded call to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvCall {
    Get {
        key: String,
    },
    Put {
        key: String,
        value: String,
        precondition: Precondition,
    },
    Delete {
        key: String,
    },
    Watch {
        key: String,
        since: Version,
        timeout: Duration,
    },
}

impl KvCall {
    pub fn op(&self) -> KvOp {
        match self {
            KvCall::Get { .. } => KvOp::Get,
            KvCall::Put { .. } => KvOp::Put,
            KvCall::Delete { .. } => KvOp::Delete,
            KvCall::Watch { .. } => KvOp::Watch,
        }
    }
}

/// Scripted outcome for the next watch call
#[derive(Debug, Clone)]
pub enum FakeWatch {
    /// Another party writes (`Some`) or deletes (`None`) the watched key
    /// after `after`. Times out instead if `after` exceeds the watch timeout.
    Write {
        value: Option<String>,
        after: Duration,
    },
    /// The watch fails with `error` after `after`
    Fail { error: KvError, after: Duration },
}

#[derive(Debug, Clone, Default)]
struct Slot {
    value: Option<String>,
    revision: u64,
}

impl Slot {
    fn entry(&self) -> Option<KvEntry> {
        self.value
            .as_ref()
            .map(|v| KvEntry::new(v.clone(), Version(self.revision)))
    }
}

#[derive(Debug, Clone)]
struct Interference {
    key: String,
    value: Option<String>,
}

#[derive(Default)]
struct FakeState {
    slots: HashMap<String, Slot>,
    calls: Vec<KvCall>,
    failures: HashMap<KvOp, VecDeque<KvError>>,
    interference: HashMap<KvOp, VecDeque<Interference>>,
    lost_acks: HashMap<String, VecDeque<KvError>>,
    watches: VecDeque<FakeWatch>,
    latency: Duration,
}

impl FakeState {
    fn write(&mut self, key: &str, value: Option<String>) -> Version {
        let slot = self.slots.entry(key.to_string()).or_default();
        slot.revision += 1;
        slot.value = value;
        Version(slot.revision)
    }

    fn revision(&self, key: &str) -> Version {
        Version(self.slots.get(key).map(|s| s.revision).unwrap_or(0))
    }

    fn entry(&self, key: &str) -> Option<KvEntry> {
        self.slots.get(key).and_then(Slot::entry)
    }

    /// Record the call, charge latency, apply interference and injected failures
    fn begin(&mut self, call: KvCall, clock: &FakeClock) -> Result<(), KvError> {
        let op = call.op();
        self.calls.push(call);
        clock.advance(self.latency);
        if let Some(i) = self.interference.get_mut(&op).and_then(VecDeque::pop_front) {
            self.write(&i.key, i.value);
        }
        match self.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Deterministic in-memory store driven by a [`FakeClock`]
#[derive(Clone)]
pub struct FakeKvStore {
    state: Arc<Mutex<FakeState>>,
    clock: FakeClock,
}

impl FakeKvStore {
    pub fn new(clock: FakeClock) -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState::default())),
            clock,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn clock(&self) -> &FakeClock {
        &self.clock
    }

    /// Set a key directly, bypassing call recording
    pub fn set(&self, key: &str, value: &str) -> Version {
        self.lock().write(key, Some(value.to_string()))
    }

    /// Remove a key directly, bypassing call recording
    pub fn remove(&self, key: &str) {
        let mut state = self.lock();
        if state.entry(key).is_some() {
            state.write(key, None);
        }
    }

    /// Current value of a key, bypassing call recording
    pub fn value(&self, key: &str) -> Option<String> {
        self.lock().entry(key).map(|e| e.value)
    }

    /// Current revision of a key, bypassing call recording
    pub fn revision(&self, key: &str) -> Version {
        self.lock().revision(key)
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<KvCall> {
        self.lock().calls.clone()
    }

    /// Count recorded calls of one kind
    pub fn call_count(&self, op: KvOp) -> usize {
        self.lock().calls.iter().filter(|c| c.op() == op).count()
    }

    /// Clear recorded calls
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Fail the next call of `op` with `error`
    pub fn fail_next(&self, op: KvOp, error: KvError) {
        self.lock().failures.entry(op).or_default().push_back(error);
    }

    /// Let another writer change `key` just before the next call of `op`
    pub fn interfere_before(&self, op: KvOp, key: &str, value: Option<&str>) {
        self.lock()
            .interference
            .entry(op)
            .or_default()
            .push_back(Interference {
                key: key.to_string(),
                value: value.map(str::to_string),
            });
    }

    /// Apply the next put to `key`, then report `error` to the caller
    pub fn lose_next_ack(&self, key: &str, error: KvError) {
        self.lock()
            .lost_acks
            .entry(key.to_string())
            .or_default()
            .push_back(error);
    }

    /// Script the outcome of the next unscripted watch
    pub fn push_watch(&self, watch: FakeWatch) {
        self.lock().watches.push_back(watch);
    }

    /// Advance the clock by `latency` on every call
    pub fn set_latency(&self, latency: Duration) {
        self.lock().latency = latency;
    }
}

impl KvStore for FakeKvStore {
    fn get(&self, key: &str) -> Result<Option<KvEntry>, KvError> {
        let mut state = self.lock();
        state.begin(
            KvCall::Get {
                key: key.to_string(),
            },
            &self.clock,
        )?;
        Ok(state.entry(key))
    }

    fn put(&self, key: &str, value: &str, precondition: Precondition) -> Result<Version, KvError> {
        let mut state = self.lock();
        state.begin(
            KvCall::Put {
                key: key.to_string(),
                value: value.to_string(),
                precondition: precondition.clone(),
            },
            &self.clock,
        )?;

        let current = state.entry(key);
        match (&precondition, &current) {
            (Precondition::None, _) => {}
            (Precondition::Absent, None) => {}
            (Precondition::Absent, Some(_)) => return Err(KvError::AlreadyExists(key.to_string())),
            (Precondition::ValueEquals(_), None) => return Err(KvError::KeyAbsent(key.to_string())),
            (Precondition::ValueEquals(expected), Some(entry)) if &entry.value == expected => {}
            (Precondition::ValueEquals(_), Some(_)) => {
                return Err(KvError::PreconditionFailed(key.to_string()))
            }
            (Precondition::VersionEquals(expected), _) if state.revision(key) == *expected => {}
            (Precondition::VersionEquals(_), _) => {
                return Err(KvError::PreconditionFailed(key.to_string()))
            }
        }
        let version = state.write(key, Some(value.to_string()));
        match state.lost_acks.get_mut(key).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(version),
        }
    }

    fn delete(&self, key: &str) -> Result<(), KvError> {
        let mut state = self.lock();
        state.begin(
            KvCall::Delete {
                key: key.to_string(),
            },
            &self.clock,
        )?;
        if state.entry(key).is_none() {
            return Err(KvError::KeyAbsent(key.to_string()));
        }
        state.write(key, None);
        Ok(())
    }

    fn watch(
        &self,
        key: &str,
        since: Version,
        timeout: Duration,
    ) -> Result<Option<KvEntry>, KvError> {
        let mut state = self.lock();
        state.begin(
            KvCall::Watch {
                key: key.to_string(),
                since,
                timeout,
            },
            &self.clock,
        )?;

        if state.revision(key) != since {
            return Ok(state.entry(key));
        }

        match state.watches.pop_front() {
            Some(FakeWatch::Write { value, after }) if after < timeout => {
                self.clock.advance(after);
                state.write(key, value);
                Ok(state.entry(key))
            }
            Some(FakeWatch::Fail { error, after }) if after < timeout => {
                self.clock.advance(after);
                Err(error)
            }
            _ => {
                self.clock.advance(timeout);
                Err(KvError::TimedOut(key.to_string()))
            }
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
