// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Settings for a [`VersionedConfigStore`](super::VersionedConfigStore)
//!
//! ```toml
//! prefix = "exhibitor"
//! holder = "zk-node-1"
//! lock_wait = "15s"
//! retry_delay = "250ms"
//! ```

use crate::coordination::lock::DEFAULT_RETRY_DELAY;
use crate::id::HolderId;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Prefix used when none is configured
pub const DEFAULT_PREFIX: &str = "kvsync";

/// How long `store` waits for the lock when nothing is configured
pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSettings {
    /// Namespace for the derived lock and config keys
    pub prefix: String,
    /// Overrides `<prefix>/lock`
    pub lock_key: Option<String>,
    /// Overrides `<prefix>/config`
    pub config_key: Option<String>,
    /// Identity written into the lock key; host name when unset
    pub holder: Option<String>,
    /// Fixed budget `store` waits for the lock
    #[serde(with = "humantime_serde")]
    pub lock_wait: Duration,
    /// Pause after transient store errors
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            lock_key: None,
            config_key: None,
            holder: None,
            lock_wait: DEFAULT_LOCK_WAIT,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl StoreSettings {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            ..Self::default()
        }
    }

    pub fn with_holder(mut self, holder: impl Into<String>) -> Self {
        self.holder = Some(holder.into());
        self
    }

    pub fn with_lock_wait(mut self, lock_wait: Duration) -> Self {
        self.lock_wait = lock_wait;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn from_toml_str(text: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn lock_key(&self) -> String {
        self.lock_key
            .clone()
            .unwrap_or_else(|| format!("{}/lock", self.prefix.trim_end_matches('/')))
    }

    pub fn config_key(&self) -> String {
        self.config_key
            .clone()
            .unwrap_or_else(|| format!("{}/config", self.prefix.trim_end_matches('/')))
    }

    pub fn holder(&self) -> HolderId {
        match &self.holder {
            Some(holder) => HolderId::new(holder.clone()),
            None => HolderId::from_environment(),
        }
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
