// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key-value store abstraction consumed by the lock and config store

pub mod traits;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use traits::{KvEntry, KvError, KvStore, Precondition, Version};

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeKvStore, FakeWatch, KvCall, KvOp};
