// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rate-limit rule configuration
//!
//! One shape covers both parameter spellings: `limit`/`window` and the older
//! `count`/`period` are accepted for the same fields.

use crate::time_unit::TimeUnit;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Admission algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// Aligned, non-overlapping slots with an atomic counter each
    #[default]
    #[serde(alias = "fixed")]
    FixedWindow,
    /// Trailing log of admitted timestamps
    #[serde(alias = "sliding")]
    SlidingWindow,
}

/// How the per-request resource key is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyType {
    /// One shared counter per protected operation
    #[default]
    Method,
    /// One counter per caller address
    Ip,
    /// One counter per caller address and operation
    IpMethod,
}

/// A rate-limit rule for one protected operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitRule {
    /// Prepended to every derived resource key
    pub prefix: String,
    /// Operation identity; empty means "use the caller-supplied operation name"
    pub key: String,
    /// Requests permitted per window
    #[serde(alias = "count")]
    pub limit: u64,
    /// Window size, in `unit`
    #[serde(alias = "period")]
    pub window: u64,
    pub unit: TimeUnit,
    pub algorithm: Algorithm,
    pub key_type: KeyType,
    /// Returned verbatim to denied callers
    pub message: String,
}

impl Default for RateLimitRule {
    fn default() -> Self {
        Self {
            prefix: "rate_limit:".to_string(),
            key: String::new(),
            limit: 100,
            window: 1,
            unit: TimeUnit::Seconds,
            algorithm: Algorithm::FixedWindow,
            key_type: KeyType::Method,
            message: "too many requests, please try again later".to_string(),
        }
    }
}

impl RateLimitRule {
    pub fn new(key: impl Into<String>, limit: u64, window: u64, unit: TimeUnit) -> Self {
        Self {
            key: key.into(),
            limit,
            window,
            unit,
            ..Self::default()
        }
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_key_type(mut self, key_type: KeyType) -> Self {
        self.key_type = key_type;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Window size as a canonical duration
    pub fn window_duration(&self) -> Duration {
        self.unit.to_duration(self.window)
    }

    /// Check the rule is usable, describing the first problem found
    pub fn validate(&self) -> Result<(), String> {
        if self.limit == 0 {
            return Err("limit must be greater than zero".to_string());
        }
        if self.window_duration().is_zero() {
            return Err("window must be greater than zero".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "rate_limit_tests.rs"]
mod tests;
