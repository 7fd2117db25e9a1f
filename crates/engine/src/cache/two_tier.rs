// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-through, write-through composite cache

use super::CacheTier;
use crate::error::{BoxError, CacheError};
use crate::lock::{Locker, ReleaseGuard};
use keel_adapters::MutexAdapter;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Snapshot of one cache's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub local_hits: u64,
    pub remote_hits: u64,
    pub misses: u64,
    /// Loader invocations that succeeded
    pub loads: u64,
    pub load_failures: u64,
}

impl CacheStats {
    /// Fraction of lookups answered by either tier (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let hits = self.local_hits + self.remote_hits;
        let total = hits + self.misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

#[derive(Default)]
struct Counters {
    local_hits: AtomicU64,
    remote_hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
    load_failures: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// A named cache combining a local tier and the authoritative remote tier
///
/// Reads try local, then remote (filling local on a remote hit). Writes,
/// evictions and clears go to remote first, then local, so the local tier
/// never holds a value the remote tier was not given.
///
/// Concurrent misses on the same key may each run their loader; use
/// [`TwoTierCache::get_or_load_locked`] where at-most-once loading matters.
#[derive(Clone)]
pub struct TwoTierCache<L, R> {
    name: String,
    local: L,
    remote: R,
    counters: Arc<Counters>,
}

impl<L: CacheTier, R: CacheTier> TwoTierCache<L, R> {
    pub fn new(name: impl Into<String>, local: L, remote: R) -> Self {
        Self {
            name: name.into(),
            local,
            remote,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local(&self) -> &L {
        &self.local
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn stats(&self) -> CacheStats {
        let c = &self.counters;
        CacheStats {
            local_hits: c.local_hits.load(Ordering::Relaxed),
            remote_hits: c.remote_hits.load(Ordering::Relaxed),
            misses: c.misses.load(Ordering::Relaxed),
            loads: c.loads.load(Ordering::Relaxed),
            load_failures: c.load_failures.load(Ordering::Relaxed),
        }
    }

    /// Look up `key`: local first, then remote, filling local on a remote hit
    pub async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        check_key(key)?;
        if let Some(value) = self.local.lookup(key).await? {
            bump(&self.counters.local_hits);
            return Ok(Some(value));
        }
        match self.remote.lookup(key).await? {
            Some(value) => {
                bump(&self.counters.remote_hits);
                if let Err(e) = self.local.store(key, value.clone()).await {
                    tracing::warn!(cache = %self.name, key, error = %e, "local fill failed");
                }
                Ok(Some(value))
            }
            None => {
                bump(&self.counters.misses);
                Ok(None)
            }
        }
    }

    /// Look up `key` and decode it as `T`
    ///
    /// A value that does not decode as `T` is a [`CacheError::TypeMismatch`].
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.get(key).await? {
            Some(value) => decode(key, value).map(Some),
            None => Ok(None),
        }
    }

    /// Look up `key`, computing and storing it with `loader` on a full miss
    ///
    /// Loader errors become [`CacheError::ValueRetrieval`] and leave both
    /// tiers untouched.
    pub async fn get_or_load<T, E, F, Fut>(&self, key: &str, loader: F) -> Result<T, CacheError>
    where
        T: Serialize + DeserializeOwned,
        E: Into<BoxError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.get(key).await? {
            return decode(key, value);
        }
        self.load(key, loader).await
    }

    /// Like [`TwoTierCache::get_or_load`], but runs the loader while holding a
    /// per-key distributed lock and re-checks the cache once the lock is held
    ///
    /// If the lock is not acquired within `wait`, the cache is checked again
    /// and the loader runs without the lock.
    pub async fn get_or_load_locked<T, E, F, Fut, B>(
        &self,
        key: &str,
        locker: &Locker<B>,
        wait: Duration,
        lease: Option<Duration>,
        loader: F,
    ) -> Result<T, CacheError>
    where
        T: Serialize + DeserializeOwned,
        E: Into<BoxError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        B: MutexAdapter,
    {
        if let Some(value) = self.get(key).await? {
            return decode(key, value);
        }

        let lock_key = format!("cache-load:{}:{}", self.name, key);
        let locked = locker.try_lock_within(&lock_key, wait, lease).await?;
        if !locked {
            tracing::debug!(cache = %self.name, key, "load lock not acquired, loading unguarded");
        }

        // Released even when this future is dropped or the loader panics
        let mut guard = ReleaseGuard::new(locker, &lock_key, locked);
        let result = match self.get(key).await {
            Ok(Some(value)) => decode(key, value),
            Ok(None) => self.load(key, loader).await,
            Err(e) => Err(e),
        };

        if let Err(e) = guard.release().await {
            tracing::warn!(cache = %self.name, key, error = %e, "load lock release failed");
        }
        result
    }

    async fn load<T, E, F, Fut>(&self, key: &str, loader: F) -> Result<T, CacheError>
    where
        T: Serialize,
        E: Into<BoxError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let loaded = match loader().await {
            Ok(value) => value,
            Err(e) => {
                bump(&self.counters.load_failures);
                let source: BoxError = e.into();
                tracing::warn!(cache = %self.name, key, error = %source, "value retrieval failed");
                return Err(CacheError::ValueRetrieval {
                    key: key.to_string(),
                    source,
                });
            }
        };
        bump(&self.counters.loads);
        self.put(key, &loaded).await?;
        Ok(loaded)
    }

    /// Write through: remote first, then local
    pub async fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        let value = serde_json::to_value(value).map_err(|source| CacheError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.put_value(key, value).await
    }

    pub async fn put_value(&self, key: &str, value: Value) -> Result<(), CacheError> {
        check_key(key)?;
        if let Err(e) = self.remote.store(key, value.clone()).await {
            // Remote state is unknown after a failed write
            self.evict_local(key).await;
            return Err(e);
        }
        self.local.store(key, value).await
    }

    /// Remove `key` from both tiers, remote first
    pub async fn evict(&self, key: &str) -> Result<(), CacheError> {
        check_key(key)?;
        self.remote.evict(key).await?;
        self.local.evict(key).await
    }

    /// Remove every entry from both tiers, remote first
    pub async fn clear(&self) -> Result<(), CacheError> {
        self.remote.clear().await?;
        self.local.clear().await?;
        tracing::info!(cache = %self.name, "cache cleared");
        Ok(())
    }

    async fn evict_local(&self, key: &str) {
        if let Err(e) = self.local.evict(key).await {
            tracing::warn!(cache = %self.name, key, error = %e, "local evict failed");
        }
    }
}

fn check_key(key: &str) -> Result<(), CacheError> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey);
    }
    Ok(())
}

fn decode<T: DeserializeOwned>(key: &str, value: Value) -> Result<T, CacheError> {
    serde_json::from_value(value).map_err(|source| CacheError::TypeMismatch {
        key: key.to_string(),
        expected: std::any::type_name::<T>(),
        source,
    })
}

#[cfg(test)]
#[path = "two_tier_tests.rs"]
mod tests;
