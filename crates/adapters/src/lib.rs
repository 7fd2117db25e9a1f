// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Coordination backends: the shared store behind locks, caches, rate limits
//! and delayed queues

pub mod backend;
pub mod memory;
pub mod traced;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use backend::{
    BackendError, CoordinationBackend, CounterAdapter, KeyValueAdapter, MutexAdapter,
    QueueAdapter, TimeLogAdapter,
};
pub use memory::MemoryBackend;
pub use traced::TracedBackend;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use fake::{BackendCall, BackendOp, FakeBackend};
