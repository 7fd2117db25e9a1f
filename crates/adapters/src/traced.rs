// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced backend wrapper for consistent observability

use crate::backend::{
    BackendError, CounterAdapter, KeyValueAdapter, MutexAdapter, QueueAdapter, TimeLogAdapter,
};
use async_trait::async_trait;
use keel_core::{HolderId, SlidingOutcome};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::Instrument;

/// Run a backend call, logging its outcome and latency in the current span
async fn observed<T, F>(call: F) -> Result<T, BackendError>
where
    F: Future<Output = Result<T, BackendError>>,
{
    let start = Instant::now();
    let result = call.await;
    let elapsed_ms = start.elapsed().as_millis() as u64;
    match &result {
        Ok(_) => tracing::trace!(elapsed_ms, "ok"),
        Err(e) => tracing::error!(elapsed_ms, error = %e, "backend call failed"),
    }
    result
}

/// Wrapper that adds tracing to any backend
#[derive(Clone)]
pub struct TracedBackend<B> {
    inner: B,
}

impl<B> TracedBackend<B> {
    pub fn new(inner: B) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }
}

#[async_trait]
impl<B: KeyValueAdapter> KeyValueAdapter for TracedBackend<B> {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        let span = tracing::debug_span!("backend.get", key);
        async {
            let result = observed(self.inner.get(key)).await;
            if let Ok(value) = &result {
                tracing::trace!(hit = value.is_some(), "read");
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), BackendError> {
        let span = tracing::debug_span!("backend.set", key, len = value.len(), ttl = ?ttl);
        observed(self.inner.set(key, value, ttl))
            .instrument(span)
            .await
    }

    async fn delete(&self, key: &str) -> Result<bool, BackendError> {
        let span = tracing::debug_span!("backend.delete", key);
        observed(self.inner.delete(key)).instrument(span).await
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64, BackendError> {
        let span = tracing::info_span!("backend.delete_prefix", prefix);
        async {
            let result = observed(self.inner.delete_prefix(prefix)).await;
            if let Ok(removed) = &result {
                tracing::info!(removed, "prefix cleared");
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl<B: MutexAdapter> MutexAdapter for TracedBackend<B> {
    async fn try_acquire(
        &self,
        name: &str,
        holder: &HolderId,
        lease: Option<Duration>,
    ) -> Result<bool, BackendError> {
        let span = tracing::debug_span!("backend.try_acquire", name, %holder, lease = ?lease);
        async {
            let result = observed(self.inner.try_acquire(name, holder, lease)).await;
            if let Ok(acquired) = &result {
                tracing::debug!(acquired, "attempted");
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn release(&self, name: &str, holder: &HolderId) -> Result<bool, BackendError> {
        let span = tracing::debug_span!("backend.release", name, %holder);
        async {
            let result = observed(self.inner.release(name, holder)).await;
            // Releasing a lock the caller no longer holds is often expected
            // (lease ran out, or a cleanup path ran twice)
            if let Ok(false) = &result {
                tracing::warn!("release by non-holder ignored");
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn is_locked(&self, name: &str) -> Result<bool, BackendError> {
        let result = self.inner.is_locked(name).await;
        tracing::trace!(name, locked = ?result.as_ref().ok(), "checked");
        result
    }

    async fn is_held_by(&self, name: &str, holder: &HolderId) -> Result<bool, BackendError> {
        let result = self.inner.is_held_by(name, holder).await;
        tracing::trace!(name, %holder, held = ?result.as_ref().ok(), "checked");
        result
    }
}

#[async_trait]
impl<B: CounterAdapter> CounterAdapter for TracedBackend<B> {
    async fn increment(&self, key: &str, ttl: Option<Duration>) -> Result<u64, BackendError> {
        let span = tracing::debug_span!("backend.increment", key);
        observed(self.inner.increment(key, ttl))
            .instrument(span)
            .await
    }
}

#[async_trait]
impl<B: TimeLogAdapter> TimeLogAdapter for TracedBackend<B> {
    async fn admit(
        &self,
        key: &str,
        now_ms: u64,
        window: Duration,
        limit: u64,
    ) -> Result<SlidingOutcome, BackendError> {
        let span = tracing::debug_span!("backend.admit", key, limit);
        observed(self.inner.admit(key, now_ms, window, limit))
            .instrument(span)
            .await
    }
}

#[async_trait]
impl<B: QueueAdapter> QueueAdapter for TracedBackend<B> {
    async fn push(&self, queue: &str, item: Vec<u8>) -> Result<(), BackendError> {
        let span = tracing::info_span!("backend.push", queue, len = item.len());
        observed(self.inner.push(queue, item))
            .instrument(span)
            .await
    }

    async fn push_delayed(
        &self,
        queue: &str,
        item: Vec<u8>,
        delay: Duration,
    ) -> Result<(), BackendError> {
        let span = tracing::info_span!(
            "backend.push_delayed",
            queue,
            len = item.len(),
            delay_ms = delay.as_millis() as u64
        );
        observed(self.inner.push_delayed(queue, item, delay))
            .instrument(span)
            .await
    }

    async fn take(&self, queue: &str) -> Result<Vec<u8>, BackendError> {
        // Blocking call: no latency, only what came back
        let result = self.inner.take(queue).await;
        match &result {
            Ok(item) => tracing::debug!(queue, len = item.len(), "item taken"),
            Err(e) => tracing::error!(queue, error = %e, "take failed"),
        }
        result
    }

    async fn len(&self, queue: &str) -> Result<usize, BackendError> {
        self.inner.len(queue).await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
