// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process tier backed by a bounded moka cache

use super::CacheTier;
use crate::error::CacheError;
use async_trait::async_trait;
use keel_core::TierSettings;
use moka::future::Cache;
use serde_json::Value;

/// Local tier: capacity-bounded, optionally time-limited, private to the process
#[derive(Clone)]
pub struct LocalTier {
    entries: Cache<String, Value>,
}

impl LocalTier {
    pub fn new(settings: &TierSettings) -> Self {
        let mut builder = Cache::<String, Value>::builder().max_capacity(settings.local_capacity);
        if let Some(ttl) = settings.local_ttl {
            builder = builder.time_to_live(ttl);
        }
        Self {
            entries: builder.build(),
        }
    }

    /// Approximate entry count; moka applies pending writes lazily
    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }
}

#[async_trait]
impl CacheTier for LocalTier {
    async fn lookup(&self, key: &str) -> Result<Option<Value>, CacheError> {
        Ok(self.entries.get(key).await)
    }

    async fn store(&self, key: &str, value: Value) -> Result<(), CacheError> {
        self.entries.insert(key.to_string(), value).await;
        Ok(())
    }

    async fn evict(&self, key: &str) -> Result<(), CacheError> {
        self.entries.invalidate(key).await;
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.entries.invalidate_all();
        Ok(())
    }
}
