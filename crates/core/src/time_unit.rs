// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time units accepted by lock and rate-limit operations
//!
//! Callers pass an amount plus a unit; everything below the public API works
//! with a canonical [`Duration`].

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Unit for an integer amount of time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    #[serde(alias = "ms", alias = "millis")]
    Milliseconds,
    #[default]
    #[serde(alias = "s", alias = "secs")]
    Seconds,
    #[serde(alias = "m", alias = "mins")]
    Minutes,
    #[serde(alias = "h")]
    Hours,
    #[serde(alias = "d")]
    Days,
}

impl TimeUnit {
    /// Convert `amount` of this unit into a duration, saturating on overflow
    pub fn to_duration(self, amount: u64) -> Duration {
        match self {
            TimeUnit::Milliseconds => Duration::from_millis(amount),
            TimeUnit::Seconds => Duration::from_secs(amount),
            TimeUnit::Minutes => Duration::from_secs(amount.saturating_mul(60)),
            TimeUnit::Hours => Duration::from_secs(amount.saturating_mul(3_600)),
            TimeUnit::Days => Duration::from_secs(amount.saturating_mul(86_400)),
        }
    }
}

impl std::fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TimeUnit::Milliseconds => "milliseconds",
            TimeUnit::Seconds => "seconds",
            TimeUnit::Minutes => "minutes",
            TimeUnit::Hours => "hours",
            TimeUnit::Days => "days",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
#[path = "time_unit_tests.rs"]
mod tests;
