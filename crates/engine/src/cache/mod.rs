// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Two-tier caching: a private local tier in front of the shared remote tier
//!
//! Values are held as `serde_json::Value`. A stored `Value::Null` is a cached
//! null and is distinct from an absent key.

mod local;
mod registry;
mod remote;
mod two_tier;

pub use local::LocalTier;
pub use registry::{CacheRegistry, NamedCache};
pub use remote::RemoteTier;
pub use two_tier::{CacheStats, TwoTierCache};

use crate::error::CacheError;
use async_trait::async_trait;
use serde_json::Value;

/// One storage tier of a two-tier cache
#[async_trait]
pub trait CacheTier: Clone + Send + Sync + 'static {
    /// `Ok(None)` when the key is absent
    async fn lookup(&self, key: &str) -> Result<Option<Value>, CacheError>;

    async fn store(&self, key: &str, value: Value) -> Result<(), CacheError>;

    async fn evict(&self, key: &str) -> Result<(), CacheError>;

    async fn clear(&self) -> Result<(), CacheError>;
}
