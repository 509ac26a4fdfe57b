// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kvsync-core: coordination over a versioned key-value store
//!
//! This crate provides:
//! - A key-value store trait with conditional writes and versioned watches
//! - A pseudo-lock stored in a single key, with bounded waits
//! - A versioned configuration store with optimistic concurrency
//! - Fakes for the store, clock and activity log (`test-support`)

pub mod activity;
pub mod clock;
pub mod config;
pub mod coordination;
pub mod id;
pub mod kv;

pub use activity::{ActivityLog, NoOpActivityLog, Severity};
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{
    ConfigError, ConfigPayload, ConfigVersion, LoadedConfig, SettingsError, StoreOutcome,
    StoreSettings, VersionedConfigStore,
};
pub use coordination::{LockError, LockOptions, LockState, PseudoLock, SENTINEL};
pub use id::HolderId;
pub use kv::{KvEntry, KvError, KvStore, Precondition, Version};

#[cfg(any(test, feature = "test-support"))]
pub use activity::{ActivityEntry, FakeActivityLog};
#[cfg(any(test, feature = "test-support"))]
pub use kv::{FakeKvStore, FakeWatch, KvCall, KvOp};
