// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared tier stored in the coordination backend

use super::CacheTier;
use crate::error::CacheError;
use async_trait::async_trait;
use keel_adapters::KeyValueAdapter;
use serde_json::Value;
use std::time::Duration;

/// Remote tier: the source of truth, namespaced by cache name
#[derive(Clone)]
pub struct RemoteTier<B> {
    backend: B,
    namespace: String,
    ttl: Option<Duration>,
}

impl<B: KeyValueAdapter> RemoteTier<B> {
    pub fn new(backend: B, name: &str, ttl: Option<Duration>) -> Self {
        Self {
            backend,
            namespace: format!("{}::", name),
            ttl,
        }
    }

    /// Backend key for a cache key
    pub fn storage_key(&self, key: &str) -> String {
        format!("{}{}", self.namespace, key)
    }
}

#[async_trait]
impl<B: KeyValueAdapter> CacheTier for RemoteTier<B> {
    async fn lookup(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let Some(bytes) = self.backend.get(&self.storage_key(key)).await? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| CacheError::Decode {
                key: key.to_string(),
                source,
            })
    }

    async fn store(&self, key: &str, value: Value) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(&value).map_err(|source| CacheError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.backend
            .set(&self.storage_key(key), bytes, self.ttl)
            .await?;
        Ok(())
    }

    async fn evict(&self, key: &str) -> Result<(), CacheError> {
        self.backend.delete(&self.storage_key(key)).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let removed = self.backend.delete_prefix(&self.namespace).await?;
        tracing::debug!(namespace = %self.namespace, removed, "remote tier cleared");
        Ok(())
    }
}
