// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scoped acquisition with guaranteed release

use super::{Locker, ReleaseGuard};
use crate::error::LockError;
use keel_adapters::MutexAdapter;
use keel_core::TimeUnit;
use std::future::Future;

/// Failure delivered to a [`LockTemplate`] error callback
#[derive(Debug)]
pub enum LockTaskError<E> {
    /// Acquisition itself failed (interrupted or backend error); the task did not run
    Acquire(LockError),
    /// The task ran and returned an error
    Task(E),
    /// The task succeeded but the lock could not be released
    Release(LockError),
}

/// Runs work under a lock and always releases it afterwards
///
/// The work callback receives whether the lock was acquired and decides what
/// to do without it. The error callback is invoked at most once per call.
#[derive(Clone)]
pub struct LockTemplate<B> {
    locker: Locker<B>,
}

impl<B: MutexAdapter> LockTemplate<B> {
    pub fn new(locker: Locker<B>) -> Self {
        Self { locker }
    }

    pub fn locker(&self) -> &Locker<B> {
        &self.locker
    }

    /// Non-blocking variant: one acquisition attempt, then `work`
    pub async fn execute<T, E, F, Fut, H>(&self, key: &str, work: F, on_error: H) -> Option<T>
    where
        F: FnOnce(bool) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        H: FnOnce(LockTaskError<E>),
    {
        let attempt = self.locker.try_lock(key).await;
        self.run(key, attempt, work, on_error).await
    }

    /// Bounded-wait variant: wait up to `wait` and hold for at most `lease`
    pub async fn execute_for<T, E, F, Fut, H>(
        &self,
        key: &str,
        wait: u64,
        lease: u64,
        unit: TimeUnit,
        work: F,
        on_error: H,
    ) -> Option<T>
    where
        F: FnOnce(bool) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        H: FnOnce(LockTaskError<E>),
    {
        let attempt = self.locker.try_lock_for(key, wait, lease, unit).await;
        self.run(key, attempt, work, on_error).await
    }

    async fn run<T, E, F, Fut, H>(
        &self,
        key: &str,
        attempt: Result<bool, LockError>,
        work: F,
        on_error: H,
    ) -> Option<T>
    where
        F: FnOnce(bool) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        H: FnOnce(LockTaskError<E>),
    {
        let acquired = match attempt {
            Ok(acquired) => acquired,
            Err(e) => {
                tracing::warn!(key, error = %e, "lock acquisition failed");
                on_error(LockTaskError::Acquire(e));
                return None;
            }
        };

        let mut guard = ReleaseGuard::new(&self.locker, key, acquired);
        let outcome = work(acquired).await;
        let released = guard.release().await;

        match (outcome, released) {
            (Ok(value), Ok(())) => Some(value),
            (Ok(_), Err(e)) => {
                on_error(LockTaskError::Release(e));
                None
            }
            (Err(task), released) => {
                if let Err(e) = released {
                    tracing::warn!(key, error = %e, "lock release failed after task error");
                }
                on_error(LockTaskError::Task(task));
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
