// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Holder identities written into lock keys

use serde::{Deserialize, Serialize};

/// Environment variable consulted by [`HolderId::from_environment`]
pub const HOSTNAME_VAR: &str = "HOSTNAME";

/// Identity of a process contending for a lock
///
/// This is the exact string stored in the lock key while the lock is held,
/// so two processes must not share one unless they accept being
/// indistinguishable to each other.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HolderId(pub String);

impl HolderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Host name from the environment, or a random UUID when unset
    pub fn from_environment() -> Self {
        match std::env::var(HOSTNAME_VAR) {
            Ok(host) if !host.trim().is_empty() => Self(host.trim().to_string()),
            _ => Self::random(),
        }
    }

    /// A fresh UUID-based identity
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for HolderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for HolderId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for HolderId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
