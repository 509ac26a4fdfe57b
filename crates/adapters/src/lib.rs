// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Store and activity-log adapters for kvsync-core

pub mod activity;
pub mod memory;
pub mod traced;

pub use activity::TracingActivityLog;
pub use memory::MemoryKvStore;
pub use traced::TracedKvStore;
