// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake backend for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::backend::{
    BackendError, CounterAdapter, KeyValueAdapter, MutexAdapter, QueueAdapter, TimeLogAdapter,
};
use crate::memory::MemoryBackend;
use async_trait::async_trait;
use keel_core::{FakeClock, HolderId, QueueSettings, SlidingOutcome};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Backend operation, used to select which calls fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOp {
    Get,
    Set,
    Delete,
    DeletePrefix,
    TryAcquire,
    Release,
    IsLocked,
    IsHeldBy,
    Increment,
    Admit,
    Push,
    PushDelayed,
    Take,
    Len,
}

/// Recorded backend call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    Get { key: String },
    Set { key: String, ttl: Option<Duration> },
    Delete { key: String },
    DeletePrefix { prefix: String },
    TryAcquire { name: String, holder: HolderId, lease: Option<Duration> },
    Release { name: String, holder: HolderId },
    IsLocked { name: String },
    IsHeldBy { name: String, holder: HolderId },
    Increment { key: String, ttl: Option<Duration> },
    Admit { key: String, now_ms: u64, limit: u64 },
    Push { queue: String },
    PushDelayed { queue: String, delay: Duration },
    Take { queue: String },
    Len { queue: String },
}

impl BackendCall {
    pub fn op(&self) -> BackendOp {
        match self {
            BackendCall::Get { .. } => BackendOp::Get,
            BackendCall::Set { .. } => BackendOp::Set,
            BackendCall::Delete { .. } => BackendOp::Delete,
            BackendCall::DeletePrefix { .. } => BackendOp::DeletePrefix,
            BackendCall::TryAcquire { .. } => BackendOp::TryAcquire,
            BackendCall::Release { .. } => BackendOp::Release,
            BackendCall::IsLocked { .. } => BackendOp::IsLocked,
            BackendCall::IsHeldBy { .. } => BackendOp::IsHeldBy,
            BackendCall::Increment { .. } => BackendOp::Increment,
            BackendCall::Admit { .. } => BackendOp::Admit,
            BackendCall::Push { .. } => BackendOp::Push,
            BackendCall::PushDelayed { .. } => BackendOp::PushDelayed,
            BackendCall::Take { .. } => BackendOp::Take,
            BackendCall::Len { .. } => BackendOp::Len,
        }
    }
}

/// Fake backend: a [`MemoryBackend`] on a [`FakeClock`] that records every
/// call and can be told to fail selected operations
#[derive(Clone)]
pub struct FakeBackend {
    store: MemoryBackend<FakeClock>,
    clock: FakeClock,
    calls: Arc<Mutex<Vec<BackendCall>>>,
    failing: Arc<Mutex<HashSet<BackendOp>>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::with_clock(FakeClock::new())
    }

    /// Create a fake sharing `clock` with the code under test
    pub fn with_clock(clock: FakeClock) -> Self {
        let settings = QueueSettings {
            take_poll: Duration::from_millis(5),
            ..QueueSettings::default()
        };
        Self {
            store: MemoryBackend::from_settings(clock.clone(), &settings),
            clock,
            calls: Arc::new(Mutex::new(Vec::new())),
            failing: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn clock(&self) -> &FakeClock {
        &self.clock
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Recorded calls of one kind
    pub fn calls_of(&self, op: BackendOp) -> Vec<BackendCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.op() == op)
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    /// Make every later call of `op` fail with [`BackendError::Unavailable`]
    pub fn fail(&self, op: BackendOp) {
        self.failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(op);
    }

    /// Undo [`FakeBackend::fail`] for `op`
    pub fn recover(&self, op: BackendOp) {
        self.failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&op);
    }

    fn record(&self, call: BackendCall) -> Result<(), BackendError> {
        let op = call.op();
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
        if self
            .failing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&op)
        {
            return Err(BackendError::Unavailable(format!(
                "injected failure: {:?}",
                op
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueAdapter for FakeBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        self.record(BackendCall::Get {
            key: key.to_string(),
        })?;
        self.store.get(key).await
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), BackendError> {
        self.record(BackendCall::Set {
            key: key.to_string(),
            ttl,
        })?;
        self.store.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<bool, BackendError> {
        self.record(BackendCall::Delete {
            key: key.to_string(),
        })?;
        self.store.delete(key).await
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64, BackendError> {
        self.record(BackendCall::DeletePrefix {
            prefix: prefix.to_string(),
        })?;
        self.store.delete_prefix(prefix).await
    }
}

#[async_trait]
impl MutexAdapter for FakeBackend {
    async fn try_acquire(
        &self,
        name: &str,
        holder: &HolderId,
        lease: Option<Duration>,
    ) -> Result<bool, BackendError> {
        self.record(BackendCall::TryAcquire {
            name: name.to_string(),
            holder: holder.clone(),
            lease,
        })?;
        self.store.try_acquire(name, holder, lease).await
    }

    async fn release(&self, name: &str, holder: &HolderId) -> Result<bool, BackendError> {
        self.record(BackendCall::Release {
            name: name.to_string(),
            holder: holder.clone(),
        })?;
        self.store.release(name, holder).await
    }

    async fn is_locked(&self, name: &str) -> Result<bool, BackendError> {
        self.record(BackendCall::IsLocked {
            name: name.to_string(),
        })?;
        self.store.is_locked(name).await
    }

    async fn is_held_by(&self, name: &str, holder: &HolderId) -> Result<bool, BackendError> {
        self.record(BackendCall::IsHeldBy {
            name: name.to_string(),
            holder: holder.clone(),
        })?;
        self.store.is_held_by(name, holder).await
    }
}

#[async_trait]
impl CounterAdapter for FakeBackend {
    async fn increment(&self, key: &str, ttl: Option<Duration>) -> Result<u64, BackendError> {
        self.record(BackendCall::Increment {
            key: key.to_string(),
            ttl,
        })?;
        self.store.increment(key, ttl).await
    }
}

#[async_trait]
impl TimeLogAdapter for FakeBackend {
    async fn admit(
        &self,
        key: &str,
        now_ms: u64,
        window: Duration,
        limit: u64,
    ) -> Result<SlidingOutcome, BackendError> {
        self.record(BackendCall::Admit {
            key: key.to_string(),
            now_ms,
            limit,
        })?;
        self.store.admit(key, now_ms, window, limit).await
    }
}

#[async_trait]
impl QueueAdapter for FakeBackend {
    async fn push(&self, queue: &str, item: Vec<u8>) -> Result<(), BackendError> {
        self.record(BackendCall::Push {
            queue: queue.to_string(),
        })?;
        self.store.push(queue, item).await
    }

    async fn push_delayed(
        &self,
        queue: &str,
        item: Vec<u8>,
        delay: Duration,
    ) -> Result<(), BackendError> {
        self.record(BackendCall::PushDelayed {
            queue: queue.to_string(),
            delay,
        })?;
        self.store.push_delayed(queue, item, delay).await
    }

    async fn take(&self, queue: &str) -> Result<Vec<u8>, BackendError> {
        self.record(BackendCall::Take {
            queue: queue.to_string(),
        })?;
        self.store.take(queue).await
    }

    async fn len(&self, queue: &str) -> Result<usize, BackendError> {
        self.record(BackendCall::Len {
            queue: queue.to_string(),
        })?;
        self.store.len(queue).await
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
