// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced store wrapper for consistent observability

use kvsync_core::kv::{KvEntry, KvError, KvStore, Precondition, Version};
use std::time::{Duration, Instant};

/// Wrapper that adds tracing to any KvStore
#[derive(Clone)]
pub struct TracedKvStore<S> {
    inner: S,
}

impl<S> TracedKvStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

/// Contention and timeouts are part of normal lock traffic
fn log_failure(error: &KvError, elapsed: Duration) {
    let elapsed_ms = elapsed.as_millis() as u64;
    match error {
        KvError::KeyAbsent(_)
        | KvError::PreconditionFailed(_)
        | KvError::AlreadyExists(_)
        | KvError::TimedOut(_) => tracing::debug!(elapsed_ms, error = %error, "rejected"),
        KvError::Transient(_) => tracing::warn!(elapsed_ms, error = %error, "transient failure"),
        KvError::Protocol(_) => tracing::error!(elapsed_ms, error = %error, "failed"),
    }
}

impl<S: KvStore> KvStore for TracedKvStore<S> {
    fn get(&self, key: &str) -> Result<Option<KvEntry>, KvError> {
        let span = tracing::debug_span!("kv.get", key);
        let _guard = span.enter();

        let start = Instant::now();
        let result = self.inner.get(key);
        match &result {
            Ok(entry) => tracing::trace!(
                version = ?entry.as_ref().map(|e| e.version.get()),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "read"
            ),
            Err(e) => log_failure(e, start.elapsed()),
        }
        result
    }

    fn put(&self, key: &str, value: &str, precondition: Precondition) -> Result<Version, KvError> {
        let span = tracing::debug_span!("kv.put", key, precondition = ?precondition);
        let _guard = span.enter();

        tracing::trace!(value_len = value.len(), "writing");
        let start = Instant::now();
        let result = self.inner.put(key, value, precondition);
        match &result {
            Ok(version) => tracing::debug!(
                %version,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "written"
            ),
            Err(e) => log_failure(e, start.elapsed()),
        }
        result
    }

    fn delete(&self, key: &str) -> Result<(), KvError> {
        let span = tracing::info_span!("kv.delete", key);
        let _guard = span.enter();

        let start = Instant::now();
        let result = self.inner.delete(key);
        match &result {
            Ok(()) => tracing::info!(elapsed_ms = start.elapsed().as_millis() as u64, "deleted"),
            Err(e) => log_failure(e, start.elapsed()),
        }
        result
    }

    fn watch(
        &self,
        key: &str,
        since: Version,
        timeout: Duration,
    ) -> Result<Option<KvEntry>, KvError> {
        let span = tracing::debug_span!(
            "kv.watch",
            key,
            %since,
            timeout_ms = timeout.as_millis() as u64
        );
        let _guard = span.enter();

        let start = Instant::now();
        let result = self.inner.watch(key, since, timeout);
        match &result {
            Ok(entry) => tracing::debug!(
                version = ?entry.as_ref().map(|e| e.version.get()),
                waited_ms = start.elapsed().as_millis() as u64,
                "changed"
            ),
            Err(e) => log_failure(e, start.elapsed()),
        }
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
