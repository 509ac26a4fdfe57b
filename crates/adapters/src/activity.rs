// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Activity log backed by `tracing`

use kvsync_core::activity::{ActivityLog, Severity};

/// Forwards activity entries to `tracing` under the `activity` target
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingActivityLog;

impl ActivityLog for TracingActivityLog {
    fn record(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Info => tracing::info!(target: "activity", "{}", message),
            Severity::Error => tracing::error!(target: "activity", "{}", message),
        }
    }
}
