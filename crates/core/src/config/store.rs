// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Versioned configuration store with optimistic concurrency
//!
//! Readers go straight to the config key. Writers name the version they
//! last loaded; the write happens only if, with the pseudo-lock held, the
//! key is still at that version.
//!
//! ```text
//! store(payload, expected):
//!   acquire lock (fixed budget)      busy  -> LockUnavailable
//!   read config version              != expected -> Stale
//!   put(payload, version precondition)
//!   release lock
//! ```
//!
//! `store` folds `Stale` and `LockUnavailable` into `None`; callers that
//! need to tell them apart use `store_outcome`.

use super::payload::ConfigPayload;
use super::settings::StoreSettings;
use crate::activity::ActivityLog;
use crate::clock::{Clock, SystemClock};
use crate::coordination::lock::{LockError, LockOptions, PseudoLock};
use crate::id::HolderId;
use crate::kv::{KvEntry, KvError, KvStore, Precondition, Version};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

/// Version token of the stored configuration
pub type ConfigVersion = Version;

const STORE_ATTEMPTS: u32 = 3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error("store error on config key {key} during {op}: {source}")]
    Store {
        key: String,
        op: &'static str,
        #[source]
        source: KvError,
    },
}

/// Immutable snapshot of the configuration and the version it was read at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedConfig {
    payload: ConfigPayload,
    version: ConfigVersion,
}

impl LoadedConfig {
    pub fn new(payload: ConfigPayload, version: ConfigVersion) -> Self {
        Self { payload, version }
    }

    /// What `load` returns when no configuration has been stored yet
    pub fn empty() -> Self {
        Self::new(ConfigPayload::new(), Version::ZERO)
    }

    pub fn payload(&self) -> &ConfigPayload {
        &self.payload
    }

    pub fn version(&self) -> ConfigVersion {
        self.version
    }

    pub fn into_payload(self) -> ConfigPayload {
        self.payload
    }
}

/// Result of a store attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOutcome {
    /// Written; carries the new snapshot
    Stored(LoadedConfig),
    /// The config moved past the caller's expected version
    Stale { current: ConfigVersion },
    /// The lock stayed busy for the whole wait budget
    LockUnavailable,
}

impl StoreOutcome {
    pub fn into_loaded(self) -> Option<LoadedConfig> {
        match self {
            StoreOutcome::Stored(loaded) => Some(loaded),
            StoreOutcome::Stale { .. } | StoreOutcome::LockUnavailable => None,
        }
    }

    pub fn is_stored(&self) -> bool {
        matches!(self, StoreOutcome::Stored(_))
    }
}

/// Configuration blob guarded by a [`PseudoLock`]
///
/// One instance per process. Threads sharing an instance queue on an
/// internal mutex before contending for the distributed lock.
pub struct VersionedConfigStore<S: KvStore, C: Clock = SystemClock> {
    store: S,
    config_key: String,
    lock_wait: Duration,
    options: LockOptions,
    clock: C,
    log: Arc<dyn ActivityLog>,
    lock: Mutex<PseudoLock<S, C>>,
}

impl<S: KvStore> VersionedConfigStore<S> {
    pub fn new(
        store: S,
        settings: &StoreSettings,
        log: Arc<dyn ActivityLog>,
    ) -> Result<Self, ConfigError> {
        Self::with_clock(store, settings, log, SystemClock)
    }
}

impl<S: KvStore, C: Clock> VersionedConfigStore<S, C> {
    pub fn with_clock(
        store: S,
        settings: &StoreSettings,
        log: Arc<dyn ActivityLog>,
        clock: C,
    ) -> Result<Self, ConfigError> {
        let options = LockOptions {
            retry_delay: settings.retry_delay,
        };
        let lock = PseudoLock::with_clock(
            store.clone(),
            settings.lock_key(),
            settings.holder(),
            clock.clone(),
        )?
        .with_options(options);

        tracing::debug!(
            config_key = %settings.config_key(),
            lock_key = %lock.key(),
            holder = %lock.holder(),
            lock_wait_ms = settings.lock_wait.as_millis() as u64,
            "config store ready"
        );

        Ok(Self {
            store,
            config_key: settings.config_key(),
            lock_wait: settings.lock_wait,
            options,
            clock,
            log,
            lock: Mutex::new(lock),
        })
    }

    pub fn config_key(&self) -> &str {
        &self.config_key
    }

    pub fn lock_wait(&self) -> Duration {
        self.lock_wait
    }

    pub fn lock_key(&self) -> String {
        self.guard().key().to_string()
    }

    pub fn holder(&self) -> HolderId {
        self.guard().holder().clone()
    }

    /// A fresh lock on the same key and identity, for callers coordinating
    /// other work with config writers
    pub fn new_pseudo_lock(&self) -> Result<PseudoLock<S, C>, ConfigError> {
        let (key, holder) = {
            let lock = self.guard();
            (lock.key().to_string(), lock.holder().clone())
        };
        Ok(
            PseudoLock::with_clock(self.store.clone(), key, holder, self.clock.clone())?
                .with_options(self.options),
        )
    }

    /// Read the current configuration without taking the lock
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let loaded = match self.read()? {
            None => LoadedConfig::empty(),
            Some(entry) => LoadedConfig::new(ConfigPayload::parse(&entry.value), entry.version),
        };
        tracing::debug!(key = %self.config_key, version = %loaded.version, "config loaded");
        Ok(loaded)
    }

    /// Write `payload` if the config is still at `expected`
    ///
    /// `None` means the write did not happen, either because the config
    /// moved on or because the lock stayed busy. Reload and decide whether
    /// to retry; nothing is retried here.
    pub fn store(
        &self,
        payload: &ConfigPayload,
        expected: ConfigVersion,
    ) -> Result<Option<LoadedConfig>, ConfigError> {
        Ok(self.store_outcome(payload, expected)?.into_loaded())
    }

    /// Like [`store`](Self::store) but says why a write did not happen
    pub fn store_outcome(
        &self,
        payload: &ConfigPayload,
        expected: ConfigVersion,
    ) -> Result<StoreOutcome, ConfigError> {
        let mut lock = self.guard();
        if !lock.acquire(self.log.as_ref(), self.lock_wait)? {
            return Ok(StoreOutcome::LockUnavailable);
        }

        let written = self.write_locked(payload, expected);
        let released = lock.release();

        match (written, released) {
            (Ok(outcome), Ok(())) => Ok(outcome),
            (Ok(outcome), Err(e)) => {
                tracing::error!(key = %self.config_key, outcome = ?outcome, error = %e, "lock release failed after config write");
                Err(e.into())
            }
            (Err(e), released) => {
                if let Err(release_err) = released {
                    tracing::error!(key = %self.config_key, error = %release_err, "lock release failed");
                }
                Err(e)
            }
        }
    }

    fn write_locked(
        &self,
        payload: &ConfigPayload,
        expected: ConfigVersion,
    ) -> Result<StoreOutcome, ConfigError> {
        let current = self.read()?;
        let current_version = current.as_ref().map_or(Version::ZERO, |e| e.version);
        if current_version != expected {
            tracing::info!(
                key = %self.config_key,
                %expected,
                current = %current_version,
                "config write rejected, stale version"
            );
            return Ok(StoreOutcome::Stale {
                current: current_version,
            });
        }

        let precondition = match &current {
            None => Precondition::Absent,
            Some(entry) => Precondition::VersionEquals(entry.version),
        };
        let text = payload.render();
        let mut attempt = 1;
        loop {
            match self
                .store
                .put(&self.config_key, &text, precondition.clone())
            {
                Ok(version) => {
                    tracing::info!(key = %self.config_key, %version, "config stored");
                    return Ok(stored(&text, version));
                }
                Err(e) if e.is_transient() && attempt < STORE_ATTEMPTS => {
                    tracing::debug!(key = %self.config_key, op = "put", attempt, error = %e, "retrying");
                    attempt += 1;
                    self.clock.sleep(self.options.retry_delay);
                }
                Err(e) if e.is_contention() => return self.after_conflict(&text, expected, attempt),
                Err(source) => {
                    return Err(ConfigError::Store {
                        key: self.config_key.clone(),
                        op: "put",
                        source,
                    })
                }
            }
        }
    }

    /// Sort out a put rejected by its precondition
    ///
    /// After a transient failure the earlier attempt may have landed, in
    /// which case the key now holds exactly `text`.
    fn after_conflict(
        &self,
        text: &str,
        expected: ConfigVersion,
        attempt: u32,
    ) -> Result<StoreOutcome, ConfigError> {
        let current = self.read()?;
        match current {
            Some(entry) if attempt > 1 && entry.value == text => {
                tracing::info!(key = %self.config_key, version = %entry.version, "config stored by an earlier attempt");
                Ok(stored(&entry.value, entry.version))
            }
            current => {
                let current = current.map_or(Version::ZERO, |e| e.version);
                // Only possible if someone wrote the key without holding the lock
                tracing::warn!(key = %self.config_key, %expected, %current, "config changed while locked");
                Ok(StoreOutcome::Stale { current })
            }
        }
    }

    fn read(&self) -> Result<Option<KvEntry>, ConfigError> {
        self.retrying("get", || self.store.get(&self.config_key))
    }

    /// Run a store call, retrying transient failures a bounded number of times
    fn retrying<T>(
        &self,
        op: &'static str,
        mut call: impl FnMut() -> Result<T, KvError>,
    ) -> Result<T, ConfigError> {
        let mut attempt = 1;
        loop {
            match call() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < STORE_ATTEMPTS => {
                    tracing::debug!(key = %self.config_key, op, attempt, error = %e, "retrying");
                    attempt += 1;
                    self.clock.sleep(self.options.retry_delay);
                }
                Err(source) => {
                    return Err(ConfigError::Store {
                        key: self.config_key.clone(),
                        op,
                        source,
                    })
                }
            }
        }
    }

    fn guard(&self) -> std::sync::MutexGuard<'_, PseudoLock<S, C>> {
        self.lock.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Snapshot of what the store now holds, parsed back from the written text
fn stored(text: &str, version: ConfigVersion) -> StoreOutcome {
    StoreOutcome::Stored(LoadedConfig::new(ConfigPayload::parse(text), version))
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
