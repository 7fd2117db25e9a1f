// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One memoized two-tier cache per cache name

use super::{LocalTier, RemoteTier, TwoTierCache};
use keel_adapters::KeyValueAdapter;
use keel_core::CacheSettings;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// The composite cache type handed out by a [`CacheRegistry`]
pub type NamedCache<B> = TwoTierCache<LocalTier, RemoteTier<B>>;

/// Creates each named cache on first request and returns the same instance
/// afterwards; caches are never removed
#[derive(Clone)]
pub struct CacheRegistry<B> {
    backend: B,
    settings: Arc<CacheSettings>,
    caches: Arc<Mutex<HashMap<String, Arc<NamedCache<B>>>>>,
}

impl<B: KeyValueAdapter> CacheRegistry<B> {
    pub fn new(backend: B, settings: CacheSettings) -> Self {
        Self {
            backend,
            settings: Arc::new(settings),
            caches: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The cache for `name`, created with its tier settings on first use
    pub fn get_cache(&self, name: &str) -> Arc<NamedCache<B>> {
        let mut caches = self.caches.lock().unwrap_or_else(|e| e.into_inner());
        let cache = caches.entry(name.to_string()).or_insert_with(|| {
            let tier = self.settings.tier_for(name);
            tracing::info!(
                cache = name,
                local_capacity = tier.local_capacity,
                local_ttl = ?tier.local_ttl,
                remote_ttl = ?tier.remote_ttl,
                "cache created"
            );
            Arc::new(TwoTierCache::new(
                name,
                LocalTier::new(&tier),
                RemoteTier::new(self.backend.clone(), name, tier.remote_ttl),
            ))
        });
        Arc::clone(cache)
    }

    /// Names of every cache created so far, sorted
    pub fn cache_names(&self) -> Vec<String> {
        let caches = self.caches.lock().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = caches.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
