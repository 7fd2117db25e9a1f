// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordination backend traits
//!
//! A backend is the shared store every process in the deployment talks to.
//! Each capability is a separate trait so wrappers and fakes can be layered
//! per concern; [`CoordinationBackend`] bundles them for callers that need
//! the full set.

use async_trait::async_trait;
use keel_core::{HolderId, SlidingOutcome};
use std::time::Duration;
use thiserror::Error;

/// Errors from coordination backend operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Expiring byte values under string keys
#[async_trait]
pub trait KeyValueAdapter: Clone + Send + Sync + 'static {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError>;

    /// Store `value`, replacing any previous value; `ttl` None never expires
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>)
        -> Result<(), BackendError>;

    /// Remove `key`, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool, BackendError>;

    /// Remove every key starting with `prefix`, returning how many were removed
    async fn delete_prefix(&self, prefix: &str) -> Result<u64, BackendError>;
}

/// Named reentrant mutexes with optional leases
#[async_trait]
pub trait MutexAdapter: Clone + Send + Sync + 'static {
    /// Acquire `name` for `holder` without waiting
    ///
    /// Succeeds when the lock is free, its lease has run out, or `holder`
    /// already owns it (re-entry, which replaces the lease).
    async fn try_acquire(
        &self,
        name: &str,
        holder: &HolderId,
        lease: Option<Duration>,
    ) -> Result<bool, BackendError>;

    /// Release one level held by `holder`; false when `holder` does not own it
    async fn release(&self, name: &str, holder: &HolderId) -> Result<bool, BackendError>;

    async fn is_locked(&self, name: &str) -> Result<bool, BackendError>;

    async fn is_held_by(&self, name: &str, holder: &HolderId) -> Result<bool, BackendError>;
}

/// Atomic counters
#[async_trait]
pub trait CounterAdapter: Clone + Send + Sync + 'static {
    /// Increment `key` and return the new value
    ///
    /// A missing or expired counter starts at 1 and expires `ttl` after that
    /// first increment; later increments leave the expiry alone.
    async fn increment(&self, key: &str, ttl: Option<Duration>) -> Result<u64, BackendError>;
}

/// Time-ordered admission logs for sliding windows
#[async_trait]
pub trait TimeLogAdapter: Clone + Send + Sync + 'static {
    /// Atomically prune entries older than `now_ms - window`, then record
    /// `now_ms` if fewer than `limit` entries remain
    async fn admit(
        &self,
        key: &str,
        now_ms: u64,
        window: Duration,
        limit: u64,
    ) -> Result<SlidingOutcome, BackendError>;
}

/// Named FIFO queues with delayed delivery
#[async_trait]
pub trait QueueAdapter: Clone + Send + Sync + 'static {
    /// Enqueue an item for immediate delivery
    async fn push(&self, queue: &str, item: Vec<u8>) -> Result<(), BackendError>;

    /// Enqueue an item that becomes visible after `delay`
    async fn push_delayed(
        &self,
        queue: &str,
        item: Vec<u8>,
        delay: Duration,
    ) -> Result<(), BackendError>;

    /// Wait until an item is due, then remove and return it
    ///
    /// Dropping the returned future before it completes leaves the queue
    /// unchanged.
    async fn take(&self, queue: &str) -> Result<Vec<u8>, BackendError>;

    /// Items waiting in `queue`, due or not
    async fn len(&self, queue: &str) -> Result<usize, BackendError>;
}

/// Everything the coordination primitives need from a shared store
pub trait CoordinationBackend:
    KeyValueAdapter + MutexAdapter + CounterAdapter + TimeLogAdapter + QueueAdapter
{
}

impl<T> CoordinationBackend for T where
    T: KeyValueAdapter + MutexAdapter + CounterAdapter + TimeLogAdapter + QueueAdapter
{
}
