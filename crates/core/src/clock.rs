// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling
//!
//! Two readings are exposed: a monotonic [`Instant`] for local deadlines
//! (leases, TTLs, delays) and wall-clock milliseconds since the Unix epoch for
//! values that must agree across processes (rate-window slots and log entries).

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// A clock that provides the current time
pub trait Clock: Clone + Send + Sync + 'static {
    /// Monotonic reading
    fn now(&self) -> Instant;

    /// Wall-clock milliseconds since the Unix epoch
    fn epoch_ms(&self) -> u64;
}

/// Real system clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_ms(&self) -> u64 {
        // A clock set before 1970 reads as the epoch itself
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Epoch reading a fresh [`FakeClock`] starts at (aligned to whole seconds)
pub const FAKE_EPOCH_MS: u64 = 1_700_000_000_000;

#[derive(Debug)]
struct FakeTime {
    instant: Instant,
    epoch_ms: u64,
}

/// Fake clock for testing with controllable time
///
/// Both readings move together, so a lease measured with [`Clock::now`] and a
/// window slot computed from [`Clock::epoch_ms`] always agree.
#[derive(Clone, Debug)]
pub struct FakeClock {
    current: Arc<Mutex<FakeTime>>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self::at_epoch_ms(FAKE_EPOCH_MS)
    }

    /// Create a fake clock whose wall-clock reading starts at `epoch_ms`
    pub fn at_epoch_ms(epoch_ms: u64) -> Self {
        Self {
            current: Arc::new(Mutex::new(FakeTime {
                instant: Instant::now(),
                epoch_ms,
            })),
        }
    }

    /// Advance the clock by the given duration
    pub fn advance(&self, duration: Duration) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        current.instant += duration;
        current.epoch_ms += duration.as_millis() as u64;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .instant
    }

    fn epoch_ms(&self) -> u64 {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .epoch_ms
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
