// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Window arithmetic for admission control
//!
//! Fixed windows count requests in aligned slots (`slot = floor(now / window)`)
//! and can admit up to twice the limit across a slot boundary. Sliding windows
//! keep a log of admitted timestamps and count only the ones inside
//! `[now - window, now]`.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

fn window_ms(window: Duration) -> u64 {
    (window.as_millis() as u64).max(1)
}

/// Index of the fixed-window slot containing `epoch_ms`
pub fn window_slot(epoch_ms: u64, window: Duration) -> u64 {
    epoch_ms / window_ms(window)
}

/// Time left until the slot containing `epoch_ms` ends
pub fn slot_remaining(epoch_ms: u64, window: Duration) -> Duration {
    let window_ms = window_ms(window);
    Duration::from_millis(window_ms - epoch_ms % window_ms)
}

/// Backend key of the counter for one slot of a resource
pub fn slot_key(resource_key: &str, slot: u64) -> String {
    format!("{}:{}", resource_key, slot)
}

/// Result of a sliding-window admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlidingOutcome {
    pub admitted: bool,
    /// Entries inside the window after this check (including the new one)
    pub count: u64,
    /// Oldest entry still inside the window
    pub oldest_ms: Option<u64>,
}

impl SlidingOutcome {
    /// How long until the oldest entry leaves the window
    pub fn retry_after(&self, now_ms: u64, window: Duration) -> Duration {
        match self.oldest_ms {
            Some(oldest) if !self.admitted => {
                let leaves_at = oldest + window_ms(window);
                Duration::from_millis(leaves_at.saturating_sub(now_ms).max(1))
            }
            _ => Duration::ZERO,
        }
    }
}

/// Time-ordered log of admitted request timestamps
#[derive(Debug, Clone, Default)]
pub struct SlidingLog {
    entries: VecDeque<u64>,
}

impl SlidingLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop entries older than `now_ms - window`
    pub fn prune(&mut self, now_ms: u64, window: Duration) {
        let cutoff = now_ms.saturating_sub(window_ms(window));
        while self.entries.front().is_some_and(|&t| t < cutoff) {
            self.entries.pop_front();
        }
    }

    /// Prune, then record `now_ms` if fewer than `limit` entries remain
    ///
    /// Denied requests are not recorded.
    pub fn admit(&mut self, now_ms: u64, window: Duration, limit: u64) -> SlidingOutcome {
        self.prune(now_ms, window);
        let admitted = (self.entries.len() as u64) < limit;
        if admitted {
            // Keep the log ordered even if a caller's clock stepped backwards
            let at = self.entries.back().map_or(now_ms, |&last| last.max(now_ms));
            self.entries.push_back(at);
        }
        SlidingOutcome {
            admitted,
            count: self.entries.len() as u64,
            oldest_ms: self.entries.front().copied(),
        }
    }
}

#[cfg(test)]
#[path = "window_tests.rs"]
mod tests;
