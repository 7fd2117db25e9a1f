// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named, reentrant, lease-based distributed locks
//!
//! A [`Locker`] is one logical holder. Re-entry is tracked per holder, not per
//! OS thread or task: every clone of a `Locker` acts as the same holder, and
//! [`Locker::fork`] creates a new one sharing the backend. Hand each
//! concurrent task its own fork when they must exclude each other.

mod template;

pub use template::{LockTaskError, LockTemplate};

use crate::error::LockError;
use keel_adapters::MutexAdapter;
use keel_core::{HolderId, IdGen, LockSettings, TimeUnit, UuidIdGen};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Handle for acquiring and releasing named locks as one holder
#[derive(Clone)]
pub struct Locker<B> {
    backend: B,
    holder: HolderId,
    retry_interval: Duration,
    default_lease: Option<Duration>,
    cancel: Option<CancellationToken>,
}

impl<B: MutexAdapter> Locker<B> {
    /// Create a locker with a fresh holder identity
    pub fn new(backend: B, settings: &LockSettings) -> Self {
        Self {
            backend,
            holder: UuidIdGen.next_holder(),
            retry_interval: settings.retry_interval,
            default_lease: settings.default_lease,
            cancel: None,
        }
    }

    pub fn with_holder(mut self, holder: HolderId) -> Self {
        self.holder = holder;
        self
    }

    /// Make bounded waits (`try_lock_for`, `try_lock_within`) stop with
    /// [`LockError::Interrupted`] once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// A new holder sharing this locker's backend and settings
    pub fn fork(&self) -> Self {
        Self {
            holder: UuidIdGen.next_holder(),
            ..self.clone()
        }
    }

    pub fn holder(&self) -> &HolderId {
        &self.holder
    }

    /// Block until `key` is acquired, using the configured default lease
    ///
    /// There is no timeout and no cancellation; use [`Locker::try_lock_for`]
    /// for a bounded wait.
    pub async fn lock(&self, key: &str) -> Result<(), LockError> {
        self.acquire_blocking(key, self.default_lease).await
    }

    /// Block until `key` is acquired; the lock expires `lease` after acquisition
    ///
    /// A lease too large to represent as a deadline never expires.
    pub async fn lock_with_lease(&self, key: &str, lease: Duration) -> Result<(), LockError> {
        self.acquire_blocking(key, Some(lease)).await
    }

    pub async fn lock_for(&self, key: &str, lease: u64, unit: TimeUnit) -> Result<(), LockError> {
        self.acquire_blocking(key, Some(unit.to_duration(lease))).await
    }

    async fn acquire_blocking(&self, key: &str, lease: Option<Duration>) -> Result<(), LockError> {
        check_key(key)?;
        let mut attempts: u64 = 0;
        loop {
            if self.backend.try_acquire(key, &self.holder, lease).await? {
                tracing::debug!(key, holder = %self.holder, attempts, "lock acquired");
                return Ok(());
            }
            attempts += 1;
            tokio::time::sleep(self.retry_interval).await;
        }
    }

    /// Acquire `key` if it is free right now
    ///
    /// The lock has no lease and is held until unlocked; the configured
    /// default lease only applies to [`Locker::lock`].
    pub async fn try_lock(&self, key: &str) -> Result<bool, LockError> {
        check_key(key)?;
        Ok(self.backend.try_acquire(key, &self.holder, None).await?)
    }

    /// Try for up to `wait` to acquire `key`; if acquired it expires after `lease`
    ///
    /// Returns `Ok(false)` when `wait` elapses, and
    /// `Err(LockError::Interrupted)` when the cancellation token fires first.
    pub async fn try_lock_for(
        &self,
        key: &str,
        wait: u64,
        lease: u64,
        unit: TimeUnit,
    ) -> Result<bool, LockError> {
        self.try_lock_within(key, unit.to_duration(wait), Some(unit.to_duration(lease)))
            .await
    }

    pub async fn try_lock_within(
        &self,
        key: &str,
        wait: Duration,
        lease: Option<Duration>,
    ) -> Result<bool, LockError> {
        check_key(key)?;
        // None when `wait` is too large to represent: wait without a deadline
        let deadline = Instant::now().checked_add(wait);
        loop {
            if self.is_cancelled() {
                return Err(LockError::Interrupted {
                    key: key.to_string(),
                });
            }
            if self.backend.try_acquire(key, &self.holder, lease).await? {
                return Ok(true);
            }

            let pause = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        tracing::debug!(
                            key,
                            holder = %self.holder,
                            wait_ms = wait.as_millis() as u64,
                            "lock wait elapsed"
                        );
                        return Ok(false);
                    }
                    self.retry_interval.min(deadline - now)
                }
                None => self.retry_interval,
            };
            match &self.cancel {
                Some(token) => {
                    tokio::select! {
                        _ = token.cancelled() => {
                            return Err(LockError::Interrupted { key: key.to_string() });
                        }
                        _ = tokio::time::sleep(pause) => {}
                    }
                }
                None => tokio::time::sleep(pause).await,
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|t| t.is_cancelled())
    }

    /// Release one level of `key` held by this holder
    ///
    /// Unlocking a key this holder does not hold is a no-op.
    pub async fn unlock(&self, key: &str) -> Result<(), LockError> {
        check_key(key)?;
        if !self.backend.release(key, &self.holder).await? {
            tracing::debug!(key, holder = %self.holder, "unlock by non-holder ignored");
        }
        Ok(())
    }

    /// Unlock `key` only when `locked` is true and this holder still owns it
    pub async fn unlock_if(&self, locked: bool, key: &str) -> Result<(), LockError> {
        if locked && self.is_held_by_current(key).await? {
            self.unlock(key).await?;
        }
        Ok(())
    }

    /// Whether any holder owns `key`
    pub async fn is_locked(&self, key: &str) -> Result<bool, LockError> {
        check_key(key)?;
        Ok(self.backend.is_locked(key).await?)
    }

    /// Whether this holder owns `key`
    pub async fn is_held_by_current(&self, key: &str) -> Result<bool, LockError> {
        check_key(key)?;
        Ok(self.backend.is_held_by(key, &self.holder).await?)
    }
}

/// Releases a held lock if the owning future is dropped before `release`
pub(crate) struct ReleaseGuard<B: MutexAdapter> {
    locker: Locker<B>,
    key: String,
    armed: bool,
}

impl<B: MutexAdapter> ReleaseGuard<B> {
    /// Guard `key`; an unarmed guard never unlocks
    pub(crate) fn new(locker: &Locker<B>, key: &str, armed: bool) -> Self {
        Self {
            locker: locker.clone(),
            key: key.to_string(),
            armed,
        }
    }

    /// Unlock now; stays armed until the unlock has returned
    pub(crate) async fn release(&mut self) -> Result<(), LockError> {
        if !self.armed {
            return Ok(());
        }
        let result = self.locker.unlock(&self.key).await;
        self.armed = false;
        result
    }
}

impl<B: MutexAdapter> Drop for ReleaseGuard<B> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let locker = self.locker.clone();
        let key = std::mem::take(&mut self.key);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = locker.unlock(&key).await {
                        tracing::warn!(key = %key, error = %e, "deferred lock release failed");
                    }
                });
            }
            Err(_) => {
                tracing::warn!(
                    key = %key,
                    "no runtime for deferred release; lock held until lease expiry"
                );
            }
        }
    }
}

fn check_key(key: &str) -> Result<(), LockError> {
    if key.is_empty() {
        return Err(LockError::InvalidKey);
    }
    Ok(())
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
