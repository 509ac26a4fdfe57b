// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Activity log sink for operator-visible failures

use std::sync::Arc;

/// Severity of an activity entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Receives human-readable activity entries
///
/// Implementations must not fail; nothing in this crate branches on what a
/// sink does with an entry.
pub trait ActivityLog: Send + Sync {
    fn record(&self, severity: Severity, message: &str);
}

impl<T: ActivityLog + ?Sized> ActivityLog for &T {
    fn record(&self, severity: Severity, message: &str) {
        (**self).record(severity, message)
    }
}

impl<T: ActivityLog + ?Sized> ActivityLog for Arc<T> {
    fn record(&self, severity: Severity, message: &str) {
        (**self).record(severity, message)
    }
}

/// Sink that drops every entry
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpActivityLog;

impl ActivityLog for NoOpActivityLog {
    fn record(&self, _severity: Severity, _message: &str) {}
}

/// Recorded activity entry
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEntry {
    pub severity: Severity,
    pub message: String,
}

/// Fake activity log for testing
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Clone, Default)]
pub struct FakeActivityLog {
    entries: Arc<std::sync::Mutex<Vec<ActivityEntry>>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded entries
    pub fn entries(&self) -> Vec<ActivityEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Entries recorded at `severity`
    pub fn with_severity(&self, severity: Severity) -> Vec<ActivityEntry> {
        self.entries()
            .into_iter()
            .filter(|e| e.severity == severity)
            .collect()
    }
}

#[cfg(any(test, feature = "test-support"))]
impl ActivityLog for FakeActivityLog {
    fn record(&self, severity: Severity, message: &str) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(ActivityEntry {
                severity,
                message: message.to_string(),
            });
    }
}
