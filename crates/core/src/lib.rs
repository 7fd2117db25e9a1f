// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! keel-core: I/O-free building blocks for the keel coordination layer
//!
//! This crate provides:
//! - Clock (real and fake) and holder-id abstractions for testable time and identity
//! - The lease-lock record used by backends to implement named mutexes
//! - Fixed-window and sliding-log arithmetic for admission control
//! - The delayed-job lifecycle state machine
//! - TOML settings for locks, caches, queues and rate-limit rules

pub mod clock;
pub mod config;
pub mod id;
pub mod job;
pub mod lock;
pub mod time_unit;
pub mod window;

// Re-exports
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{
    Algorithm, CacheSettings, KeyType, LockSettings, MaintenanceSettings, QueueSettings,
    RateLimitRule, Settings, SettingsError, TierOverride, TierSettings,
};
pub use id::{IdGen, UuidIdGen};
pub use job::{JobRecord, JobState};
pub use lock::{Acquire, HolderId, LeaseLock, Release};
pub use time_unit::TimeUnit;
pub use window::{slot_key, slot_remaining, window_slot, SlidingLog, SlidingOutcome};
