// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pseudo-lock: mutual exclusion on top of a versioned key-value store
//!
//! The lock key holds either [`SENTINEL`] (unlocked) or the identity of the
//! current holder. Acquisition flips it with a conditional write and waits
//! on a watch while someone else holds it:
//!
//! ```text
//!   loop until deadline:
//!     get(key)
//!       absent    -> put(holder, create-only)       ok -> acquired
//!       RELEASED  -> put(holder, prev == RELEASED)  ok -> acquired
//!       other     -> (no write)
//!     watch(key, since = observed revision, remaining)
//! ```
//!
//! There is no lease. A holder that dies without calling
//! [`PseudoLock::release`] leaves the key locked until an operator calls
//! [`PseudoLock::force_break`]. Release is an unconditional overwrite and
//! does not check who holds the key. Waiters are not queued; whoever's
//! conditional write lands first wins.

use crate::activity::{ActivityLog, Severity};
use crate::clock::{Clock, SystemClock};
use crate::id::HolderId;
use crate::kv::{KvError, KvStore, Precondition, Version};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Value stored in the lock key while nobody holds it
pub const SENTINEL: &str = "RELEASED";

/// Pause after a transient store error before the next attempt
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Floor for the retry pause, whatever the options say
pub const MIN_RETRY_DELAY: Duration = Duration::from_millis(1);

const RELEASE_ATTEMPTS: u32 = 3;

/// Errors that escape the lock
///
/// Contention and timeouts are not errors; `acquire` reports them by
/// returning `false`.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("lock {key} is already held by this instance")]
    AlreadyHeld { key: String },
    #[error("holder identity {0:?} collides with the unlocked sentinel")]
    InvalidHolder(String),
    #[error("unexpected store response on lock {key} during {op}: {source}")]
    Protocol {
        key: String,
        op: &'static str,
        #[source]
        source: KvError,
    },
    #[error("failed to release lock {key}: {source}")]
    Release {
        key: String,
        #[source]
        source: KvError,
    },
    #[error("store error on lock {key} during {op}: {source}")]
    Store {
        key: String,
        op: &'static str,
        #[source]
        source: KvError,
    },
}

/// What the lock key currently says
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockState {
    /// The key has never been written, or was force-broken
    Absent,
    /// The key holds the sentinel
    Released,
    /// The key names a holder
    Held(HolderId),
}

impl LockState {
    pub fn is_free(&self) -> bool {
        !matches!(self, LockState::Held(_))
    }
}

/// Tuning for the acquisition loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockOptions {
    /// Pause after a transient store error, capped by the remaining budget
    pub retry_delay: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// One acquisition attempt, from the `acquire` call to its result
///
/// Kept by the lock after a successful acquire and dropped by `release`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockSession {
    started: Instant,
    deadline: Instant,
    acquired: bool,
    passes: u32,
}

impl LockSession {
    fn begin(now: Instant, max_wait: Duration) -> Self {
        // Saturate to the furthest representable instant
        let mut wait = max_wait;
        let deadline = loop {
            match now.checked_add(wait) {
                Some(deadline) => break deadline,
                None => wait /= 2,
            }
        };
        Self {
            started: now,
            deadline,
            acquired: false,
            passes: 0,
        }
    }

    /// Budget left at `now`, `None` once the deadline has passed
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        let remaining = self.deadline.saturating_duration_since(now);
        (!remaining.is_zero()).then_some(remaining)
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    pub fn acquired(&self) -> bool {
        self.acquired
    }

    /// Number of read/write passes made against the store
    pub fn passes(&self) -> u32 {
        self.passes
    }
}

/// Errors from a get or put that leave the next pass free to try again
///
/// A timeout here is the store's own request deadline, not the caller's
/// wait budget, so it is retried like any transient error.
fn retryable(error: &KvError) -> bool {
    error.is_transient() || matches!(error, KvError::TimedOut(_))
}

/// Outcome of a single read/conditional-write pass
enum Pass {
    Acquired,
    /// Someone else holds or just took the key; wait for a change past this revision
    Contended(Version),
    /// A transient failure; pause and go again
    Transient,
    /// The budget ran out before the write could be issued
    Expired,
}

/// Mutual exclusion over one key of a [`KvStore`]
///
/// Calls take `&mut self`, so one instance serves one owner at a time.
/// Threads of the same process that contend for the same key each need
/// their own instance.
pub struct PseudoLock<S: KvStore, C: Clock = SystemClock> {
    store: S,
    key: String,
    holder: HolderId,
    clock: C,
    options: LockOptions,
    session: Option<LockSession>,
}

impl<S: KvStore> PseudoLock<S> {
    pub fn new(store: S, key: impl Into<String>, holder: HolderId) -> Result<Self, LockError> {
        Self::with_clock(store, key, holder, SystemClock)
    }
}

impl<S: KvStore, C: Clock> PseudoLock<S, C> {
    pub fn with_clock(
        store: S,
        key: impl Into<String>,
        holder: HolderId,
        clock: C,
    ) -> Result<Self, LockError> {
        if holder.as_str() == SENTINEL {
            return Err(LockError::InvalidHolder(holder.0));
        }
        Ok(Self {
            store,
            key: key.into(),
            holder,
            clock,
            options: LockOptions::default(),
            session: None,
        })
    }

    pub fn with_options(mut self, options: LockOptions) -> Self {
        self.options = options;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn holder(&self) -> &HolderId {
        &self.holder
    }

    /// Whether this instance believes it holds the lock
    pub fn is_held(&self) -> bool {
        self.session.is_some()
    }

    /// The session of the current hold, if any
    pub fn session(&self) -> Option<&LockSession> {
        self.session.as_ref()
    }

    /// Try to take the lock, waiting up to `max_wait` while it is contended
    ///
    /// Returns `Ok(false)` when the wait budget runs out, after recording
    /// one error entry in `log`. Errors are reserved for caller bugs
    /// ([`LockError::AlreadyHeld`]) and store responses the protocol does
    /// not recognize ([`LockError::Protocol`]).
    pub fn acquire(&mut self, log: &dyn ActivityLog, max_wait: Duration) -> Result<bool, LockError> {
        if self.session.is_some() {
            return Err(LockError::AlreadyHeld {
                key: self.key.clone(),
            });
        }

        let mut session = LockSession::begin(self.clock.now(), max_wait);
        if self.contend(&mut session)? {
            session.acquired = true;
            tracing::info!(
                key = %self.key,
                holder = %self.holder,
                passes = session.passes,
                waited_ms = self.clock.now().duration_since(session.started).as_millis() as u64,
                "lock acquired"
            );
            self.session = Some(session);
            return Ok(true);
        }

        tracing::warn!(
            key = %self.key,
            holder = %self.holder,
            passes = session.passes,
            max_wait_ms = max_wait.as_millis() as u64,
            "lock not acquired before deadline"
        );
        log.record(
            Severity::Error,
            &format!(
                "Could not acquire lock within {} ms, key: {}",
                max_wait.as_millis(),
                self.key
            ),
        );
        Ok(false)
    }

    /// Write the sentinel back to the key
    ///
    /// Unconditional: it does not verify that this instance, or anyone,
    /// holds the lock. Transient failures are retried a few times. The
    /// local hold is cleared whatever the outcome.
    pub fn release(&mut self) -> Result<(), LockError> {
        if self.session.take().is_none() {
            tracing::warn!(key = %self.key, holder = %self.holder, "releasing a lock this instance does not hold");
        }

        let mut attempt = 1;
        loop {
            match self.store.put(&self.key, SENTINEL, Precondition::None) {
                Ok(version) => {
                    tracing::info!(key = %self.key, holder = %self.holder, %version, "lock released");
                    return Ok(());
                }
                Err(e) if e.is_transient() && attempt < RELEASE_ATTEMPTS => {
                    tracing::debug!(key = %self.key, attempt, error = %e, "release failed, retrying");
                    attempt += 1;
                    self.clock.sleep(self.options.retry_delay);
                }
                Err(source) => {
                    tracing::error!(key = %self.key, error = %source, "release failed");
                    return Err(LockError::Release {
                        key: self.key.clone(),
                        source,
                    });
                }
            }
        }
    }

    /// Read who holds the key right now
    pub fn state(&self) -> Result<LockState, LockError> {
        match self.store.get(&self.key) {
            Ok(None) => Ok(LockState::Absent),
            Ok(Some(entry)) if entry.value == SENTINEL => Ok(LockState::Released),
            Ok(Some(entry)) => Ok(LockState::Held(HolderId::new(entry.value))),
            Err(source) => Err(self.store_error("get", source)),
        }
    }

    /// Delete the lock key regardless of who holds it
    ///
    /// Recovery for a holder that died while holding. The next acquirer
    /// recreates the key. A missing key is not an error.
    pub fn force_break(&mut self) -> Result<(), LockError> {
        self.session = None;
        match self.store.delete(&self.key) {
            Ok(()) | Err(KvError::KeyAbsent(_)) => {
                tracing::warn!(key = %self.key, by = %self.holder, "lock force-broken");
                Ok(())
            }
            Err(source) => Err(self.store_error("delete", source)),
        }
    }

    fn contend(&self, session: &mut LockSession) -> Result<bool, LockError> {
        loop {
            if session.remaining(self.clock.now()).is_none() {
                return Ok(false);
            }
            session.passes = session.passes.saturating_add(1);

            let since = match self.attempt(session)? {
                Pass::Acquired => return Ok(true),
                Pass::Expired => return Ok(false),
                Pass::Transient => {
                    self.back_off(session);
                    continue;
                }
                Pass::Contended(since) => since,
            };

            let Some(remaining) = session.remaining(self.clock.now()) else {
                return Ok(false);
            };
            match self.store.watch(&self.key, since, remaining) {
                Ok(entry) => {
                    tracing::debug!(
                        key = %self.key,
                        value = ?entry.as_ref().map(|e| e.value.as_str()),
                        "lock key changed"
                    );
                }
                Err(KvError::TimedOut(_)) => return Ok(false),
                Err(e) if e.is_transient() => {
                    tracing::debug!(key = %self.key, error = %e, "watch failed, retrying");
                    self.back_off(session);
                }
                Err(source) => return Err(self.protocol("watch", source)),
            }
        }
    }

    fn attempt(&self, session: &LockSession) -> Result<Pass, LockError> {
        let observed = match self.store.get(&self.key) {
            Ok(observed) => observed,
            Err(e) if retryable(&e) => {
                tracing::debug!(key = %self.key, error = %e, "read failed, retrying");
                return Ok(Pass::Transient);
            }
            Err(source) => return Err(self.protocol("get", source)),
        };

        let (precondition, since) = match observed {
            None => (Precondition::Absent, Version::ZERO),
            Some(entry) if entry.value == SENTINEL => (
                Precondition::ValueEquals(SENTINEL.to_string()),
                entry.version,
            ),
            Some(entry) => {
                tracing::debug!(key = %self.key, current = %entry.value, "lock held elsewhere");
                return Ok(Pass::Contended(entry.version));
            }
        };

        if session.remaining(self.clock.now()).is_none() {
            return Ok(Pass::Expired);
        }
        match self.store.put(&self.key, self.holder.as_str(), precondition) {
            Ok(_) => Ok(Pass::Acquired),
            Err(e) if e.is_contention() => {
                tracing::debug!(key = %self.key, error = %e, "lost the race for the lock");
                Ok(Pass::Contended(since))
            }
            Err(e) if retryable(&e) => {
                tracing::debug!(key = %self.key, error = %e, "write failed, retrying");
                Ok(Pass::Transient)
            }
            Err(source) => Err(self.protocol("put", source)),
        }
    }

    fn back_off(&self, session: &LockSession) {
        if let Some(remaining) = session.remaining(self.clock.now()) {
            let pause = self.options.retry_delay.max(MIN_RETRY_DELAY);
            self.clock.sleep(pause.min(remaining));
        }
    }

    fn protocol(&self, op: &'static str, source: KvError) -> LockError {
        tracing::error!(key = %self.key, op, error = %source, "unexpected store response");
        LockError::Protocol {
            key: self.key.clone(),
            op,
            source,
        }
    }

    fn store_error(&self, op: &'static str, source: KvError) -> LockError {
        LockError::Store {
            key: self.key.clone(),
            op,
            source,
        }
    }
}

impl<S: KvStore, C: Clock> Drop for PseudoLock<S, C> {
    fn drop(&mut self) {
        if self.session.is_some() {
            tracing::warn!(
                key = %self.key,
                holder = %self.holder,
                "lock dropped while held; the key stays locked until released or broken"
            );
        }
    }
}

impl<S: KvStore, C: Clock> std::fmt::Debug for PseudoLock<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PseudoLock")
            .field("key", &self.key)
            .field("holder", &self.holder)
            .field("options", &self.options)
            .field("session", &self.session)
            .finish()
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
