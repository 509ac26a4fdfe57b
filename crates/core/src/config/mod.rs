// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Versioned configuration on top of the pseudo-lock

mod payload;
mod settings;
mod store;

pub use payload::ConfigPayload;
pub use settings::{SettingsError, StoreSettings, DEFAULT_LOCK_WAIT, DEFAULT_PREFIX};
pub use store::{ConfigError, ConfigVersion, LoadedConfig, StoreOutcome, VersionedConfigStore};
