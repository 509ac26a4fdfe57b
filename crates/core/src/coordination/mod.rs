// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordination primitives over a versioned key-value store
//!
//! - **PseudoLock** - Advisory mutual exclusion through a single key whose
//!   value is either the holder identity or the unlocked sentinel

pub mod lock;

pub use lock::{
    LockError, LockOptions, LockSession, LockState, PseudoLock, DEFAULT_RETRY_DELAY, MIN_RETRY_DELAY,
    SENTINEL,
};
