// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process coordination backend
//!
//! Every operation is atomic with respect to the others because each store
//! sits behind its own mutex and no lock is held across an await. Sharing one
//! `MemoryBackend` (it is cheap to clone) between components gives them the
//! same view a networked backend would.

mod delay_queue;

use crate::backend::{
    BackendError, CounterAdapter, KeyValueAdapter, MutexAdapter, QueueAdapter, TimeLogAdapter,
};
use async_trait::async_trait;
use delay_queue::DelayQueue;
use keel_core::{
    Clock, HolderId, LeaseLock, MaintenanceSettings, QueueSettings, Release, SlidingLog,
    SlidingOutcome, SystemClock,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Debug)]
struct Expiring<T> {
    value: T,
    expires_at: Option<Instant>,
}

impl<T> Expiring<T> {
    fn new(value: T, ttl: Option<Duration>, now: Instant) -> Self {
        Self {
            value,
            expires_at: ttl.and_then(|ttl| now.checked_add(ttl)),
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|deadline| now < deadline)
    }
}

#[derive(Debug, Default)]
struct TimedLog {
    log: SlidingLog,
    /// Last admission time; an idle log is dropped once its window has passed
    touched_ms: u64,
    window: Duration,
}

struct Inner<C> {
    clock: C,
    take_poll: Duration,
    values: Mutex<HashMap<String, Expiring<Vec<u8>>>>,
    locks: Mutex<HashMap<String, LeaseLock>>,
    counters: Mutex<HashMap<String, Expiring<u64>>>,
    logs: Mutex<HashMap<String, TimedLog>>,
    queues: Mutex<HashMap<String, DelayQueue>>,
    queue_signal: Notify,
}

/// In-memory backend implementing every coordination capability
pub struct MemoryBackend<C: Clock = SystemClock> {
    inner: Arc<Inner<C>>,
}

impl<C: Clock> Clone for MemoryBackend<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl MemoryBackend<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for MemoryBackend<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MemoryBackend<C> {
    /// Create a backend whose expiries and delays follow `clock`
    pub fn with_clock(clock: C) -> Self {
        Self::from_settings(clock, &QueueSettings::default())
    }

    pub fn from_settings(clock: C, settings: &QueueSettings) -> Self {
        Self {
            inner: Arc::new(Inner {
                clock,
                take_poll: settings.take_poll,
                values: Mutex::new(HashMap::new()),
                locks: Mutex::new(HashMap::new()),
                counters: Mutex::new(HashMap::new()),
                logs: Mutex::new(HashMap::new()),
                queues: Mutex::new(HashMap::new()),
                queue_signal: Notify::new(),
            }),
        }
    }

    pub fn clock(&self) -> &C {
        &self.inner.clock
    }

    /// Drop expired values, counters, leases and idle logs
    ///
    /// Reads already ignore expired state; this only reclaims memory.
    /// Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.inner.clock.now();
        let now_ms = self.inner.clock.epoch_ms();
        let mut removed = 0;

        let mut values = lock(&self.inner.values);
        let before = values.len();
        values.retain(|_, entry| entry.is_live(now));
        removed += before - values.len();
        drop(values);

        let mut counters = lock(&self.inner.counters);
        let before = counters.len();
        counters.retain(|_, entry| entry.is_live(now));
        removed += before - counters.len();
        drop(counters);

        let mut locks = lock(&self.inner.locks);
        let before = locks.len();
        let clock = &self.inner.clock;
        locks.retain(|_, lease| {
            lease.expire(clock);
            lease.is_locked(clock)
        });
        removed += before - locks.len();
        drop(locks);

        let mut logs = lock(&self.inner.logs);
        let before = logs.len();
        logs.retain(|_, timed| {
            now_ms.saturating_sub(timed.touched_ms) <= timed.window.as_millis() as u64
        });
        removed += before - logs.len();

        removed
    }

    /// Run [`MemoryBackend::purge_expired`] every `purge_interval` until
    /// `cancel` fires
    pub fn spawn_maintenance(
        &self,
        settings: &MaintenanceSettings,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let backend = self.clone();
        // `interval` rejects a zero period
        let period = settings.purge_interval.max(Duration::from_millis(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::debug!(interval_ms = period.as_millis() as u64, "maintenance started");
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = backend.purge_expired();
                        if removed > 0 {
                            tracing::debug!(removed, "purged expired entries");
                        }
                    }
                }
            }
            tracing::debug!("maintenance stopped");
        })
    }

    fn enqueue(&self, queue: &str, item: Vec<u8>, due: Instant) {
        lock(&self.inner.queues)
            .entry(queue.to_string())
            .or_default()
            .push(due, item);
        self.inner.queue_signal.notify_waiters();
    }
}

#[async_trait]
impl<C: Clock> KeyValueAdapter for MemoryBackend<C> {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        let now = self.inner.clock.now();
        let mut values = lock(&self.inner.values);
        match values.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                values.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), BackendError> {
        let entry = Expiring::new(value, ttl, self.inner.clock.now());
        lock(&self.inner.values).insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, BackendError> {
        let now = self.inner.clock.now();
        Ok(lock(&self.inner.values)
            .remove(key)
            .is_some_and(|entry| entry.is_live(now)))
    }

    async fn delete_prefix(&self, prefix: &str) -> Result<u64, BackendError> {
        let mut values = lock(&self.inner.values);
        let before = values.len();
        values.retain(|key, _| !key.starts_with(prefix));
        Ok((before - values.len()) as u64)
    }
}

#[async_trait]
impl<C: Clock> MutexAdapter for MemoryBackend<C> {
    async fn try_acquire(
        &self,
        name: &str,
        holder: &HolderId,
        lease: Option<Duration>,
    ) -> Result<bool, BackendError> {
        let mut locks = lock(&self.inner.locks);
        let lease_lock = locks
            .entry(name.to_string())
            .or_insert_with(|| LeaseLock::new(name));
        Ok(lease_lock
            .acquire(holder, lease, &self.inner.clock)
            .is_acquired())
    }

    async fn release(&self, name: &str, holder: &HolderId) -> Result<bool, BackendError> {
        let mut locks = lock(&self.inner.locks);
        let Some(lease_lock) = locks.get_mut(name) else {
            return Ok(false);
        };
        let outcome = lease_lock.release(holder, &self.inner.clock);
        if !lease_lock.is_locked(&self.inner.clock) {
            locks.remove(name);
        }
        Ok(!matches!(outcome, Release::NotHeld))
    }

    async fn is_locked(&self, name: &str) -> Result<bool, BackendError> {
        Ok(lock(&self.inner.locks)
            .get(name)
            .is_some_and(|l| l.is_locked(&self.inner.clock)))
    }

    async fn is_held_by(&self, name: &str, holder: &HolderId) -> Result<bool, BackendError> {
        Ok(lock(&self.inner.locks)
            .get(name)
            .is_some_and(|l| l.is_held_by(holder, &self.inner.clock)))
    }
}

#[async_trait]
impl<C: Clock> CounterAdapter for MemoryBackend<C> {
    async fn increment(&self, key: &str, ttl: Option<Duration>) -> Result<u64, BackendError> {
        let now = self.inner.clock.now();
        let mut counters = lock(&self.inner.counters);
        match counters.get_mut(key) {
            Some(entry) if entry.is_live(now) => {
                entry.value = entry.value.saturating_add(1);
                Ok(entry.value)
            }
            _ => {
                counters.insert(key.to_string(), Expiring::new(1, ttl, now));
                Ok(1)
            }
        }
    }
}

#[async_trait]
impl<C: Clock> TimeLogAdapter for MemoryBackend<C> {
    async fn admit(
        &self,
        key: &str,
        now_ms: u64,
        window: Duration,
        limit: u64,
    ) -> Result<SlidingOutcome, BackendError> {
        let mut logs = lock(&self.inner.logs);
        let timed = logs.entry(key.to_string()).or_default();
        let outcome = timed.log.admit(now_ms, window, limit);
        if outcome.admitted {
            timed.touched_ms = now_ms;
        }
        timed.window = window;
        Ok(outcome)
    }
}

#[async_trait]
impl<C: Clock> QueueAdapter for MemoryBackend<C> {
    async fn push(&self, queue: &str, item: Vec<u8>) -> Result<(), BackendError> {
        self.enqueue(queue, item, self.inner.clock.now());
        Ok(())
    }

    async fn push_delayed(
        &self,
        queue: &str,
        item: Vec<u8>,
        delay: Duration,
    ) -> Result<(), BackendError> {
        let due = self.inner.clock.now().checked_add(delay).ok_or_else(|| {
            BackendError::InvalidArgument(format!("delay {:?} is out of range", delay))
        })?;
        self.enqueue(queue, item, due);
        Ok(())
    }

    async fn take(&self, queue: &str) -> Result<Vec<u8>, BackendError> {
        loop {
            // Register for wakeups before looking, so a push between the
            // check and the wait is not missed
            let notified = self.inner.queue_signal.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let next_due = {
                let now = self.inner.clock.now();
                let mut queues = lock(&self.inner.queues);
                match queues.get_mut(queue) {
                    Some(pending) => {
                        if let Some(item) = pending.pop_due(now) {
                            return Ok(item);
                        }
                        pending.next_due()
                    }
                    None => None,
                }
            };

            match next_due {
                Some(due) => {
                    let wait = due
                        .saturating_duration_since(self.inner.clock.now())
                        .min(self.inner.take_poll);
                    tokio::select! {
                        _ = &mut notified => {}
                        _ = tokio::time::sleep(wait) => {}
                    }
                }
                None => notified.await,
            }
        }
    }

    async fn len(&self, queue: &str) -> Result<usize, BackendError> {
        Ok(lock(&self.inner.queues)
            .get(queue)
            .map_or(0, DelayQueue::len))
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
