// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Versioned key-value store interface
//!
//! Everything above this trait reasons about store outcomes through
//! [`KvError`] variants. Adapters translate their client's responses
//! (HTTP status codes, error numbers, ...) into these variants at the
//! boundary, so nothing upstream ever inspects error text.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Store-assigned modification index of a single key
///
/// Only equality is meaningful to callers. Adapters guarantee the value
/// never decreases for a key, including across delete and re-create.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(pub u64);

impl Version {
    /// Revision of a key that has never been written
    pub const ZERO: Version = Version(0);

    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Current value of a key together with its revision
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KvEntry {
    pub value: String,
    pub version: Version,
}

impl KvEntry {
    pub fn new(value: impl Into<String>, version: Version) -> Self {
        Self {
            value: value.into(),
            version,
        }
    }
}

/// Condition a put must satisfy to be applied
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Precondition {
    /// Unconditional overwrite
    None,
    /// Create-only; fails with [`KvError::AlreadyExists`]
    Absent,
    /// Current value must equal the given string
    ValueEquals(String),
    /// Current revision must equal the given version
    VersionEquals(Version),
}

/// Errors from store operations
///
/// `KeyAbsent`, `PreconditionFailed`, `AlreadyExists` and `TimedOut` are
/// expected outcomes of the conditional operations. `Transient` covers
/// network or IO hiccups that may succeed on retry. `Protocol` is anything
/// the adapter could not map onto the other variants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KvError {
    #[error("key not found: {0}")]
    KeyAbsent(String),
    #[error("precondition failed on {0}")]
    PreconditionFailed(String),
    #[error("key already exists: {0}")]
    AlreadyExists(String),
    #[error("watch on {0} timed out")]
    TimedOut(String),
    #[error("transient store error: {0}")]
    Transient(String),
    #[error("unexpected store response: {0}")]
    Protocol(String),
}

impl KvError {
    /// Worth retrying while time remains
    pub fn is_transient(&self) -> bool {
        matches!(self, KvError::Transient(_))
    }

    /// A conditional write lost against another writer
    pub fn is_contention(&self) -> bool {
        matches!(
            self,
            KvError::PreconditionFailed(_) | KvError::AlreadyExists(_) | KvError::KeyAbsent(_)
        )
    }
}

/// Synchronous client for a versioned key-value store
///
/// Every call blocks the calling thread. `watch` is the only call expected
/// to block for long; the others should return after one round trip.
pub trait KvStore: Clone + Send + Sync + 'static {
    /// Read a key, `None` when absent
    fn get(&self, key: &str) -> Result<Option<KvEntry>, KvError>;

    /// Write a key if `precondition` holds, returning the new revision
    fn put(&self, key: &str, value: &str, precondition: Precondition) -> Result<Version, KvError>;

    /// Remove a key; [`KvError::KeyAbsent`] when it does not exist
    fn delete(&self, key: &str) -> Result<(), KvError>;

    /// Block until the key's revision differs from `since` or `timeout` elapses
    ///
    /// Returns immediately when the revision already differs, which lets a
    /// caller pass the revision it last read without missing a change that
    /// landed in between. The result is the key's new state (`None` when it
    /// was deleted). Elapsing the timeout yields [`KvError::TimedOut`].
    fn watch(&self, key: &str, since: Version, timeout: Duration)
        -> Result<Option<KvEntry>, KvError>;
}
