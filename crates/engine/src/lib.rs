// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! keel coordination primitives over a shared backend

mod error;

pub mod cache;
pub mod lock;
pub mod pool;
pub mod rate_limit;

pub use cache::{
    CacheRegistry, CacheStats, CacheTier, LocalTier, NamedCache, RemoteTier, TwoTierCache,
};
pub use error::{BoxError, CacheError, JobError, LockError, PoolError, RateLimitError};
pub use lock::{LockTaskError, LockTemplate, Locker};
pub use pool::{DelayedJob, DelayedQueue, JobContext, JobItem, WorkerPool};
pub use rate_limit::{resource_key, RateDecision, RateLimiter, RequestContext};
