// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level settings loaded from TOML

use super::rate_limit::RateLimitRule;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while loading settings
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid setting {field}: {reason}")]
    Invalid { field: String, reason: String },
}

/// Settings for the whole coordination layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub lock: LockSettings,
    pub cache: CacheSettings,
    pub queue: QueueSettings,
    pub maintenance: MaintenanceSettings,
    #[serde(rename = "rate_limit")]
    pub rate_limits: Vec<RateLimitRule>,
}

impl Settings {
    /// Parse and validate settings from TOML content
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read, parse and validate a settings file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.lock.retry_interval.is_zero() {
            return Err(invalid("lock.retry_interval", "must be greater than zero"));
        }
        if self.queue.take_poll.is_zero() {
            return Err(invalid("queue.take_poll", "must be greater than zero"));
        }
        if self.maintenance.purge_interval.is_zero() {
            return Err(invalid(
                "maintenance.purge_interval",
                "must be greater than zero",
            ));
        }
        if self.cache.local_capacity == 0 {
            return Err(invalid("cache.local_capacity", "must be greater than zero"));
        }
        for (name, tier) in &self.cache.overrides {
            if tier.local_capacity == Some(0) {
                return Err(invalid(
                    &format!("cache.overrides.{}.local_capacity", name),
                    "must be greater than zero",
                ));
            }
        }
        for (index, rule) in self.rate_limits.iter().enumerate() {
            rule.validate()
                .map_err(|reason| invalid(&format!("rate_limit[{}]", index), &reason))?;
        }
        Ok(())
    }

    /// Find a rate-limit rule by its operation key
    pub fn rate_limit(&self, key: &str) -> Option<&RateLimitRule> {
        self.rate_limits.iter().find(|rule| rule.key == key)
    }
}

fn invalid(field: &str, reason: &str) -> SettingsError {
    SettingsError::Invalid {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Distributed lock settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockSettings {
    /// Poll interval while waiting for a held lock
    #[serde(with = "humantime_serde")]
    pub retry_interval: Duration,
    /// Lease applied by `lock`/`try_lock` when none is given; None = no lease
    #[serde(with = "humantime_serde")]
    pub default_lease: Option<Duration>,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            retry_interval: Duration::from_millis(50),
            default_lease: None,
        }
    }
}

/// Effective tier settings for one cache name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierSettings {
    pub local_capacity: u64,
    pub local_ttl: Option<Duration>,
    pub remote_ttl: Option<Duration>,
}

/// Per-cache override; unset fields inherit the cache-wide values
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TierOverride {
    pub local_capacity: Option<u64>,
    #[serde(with = "humantime_serde")]
    pub local_ttl: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub remote_ttl: Option<Duration>,
}

/// Two-tier cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Maximum entries held by each local tier
    pub local_capacity: u64,
    /// Local entry lifetime; None keeps entries until capacity eviction
    #[serde(with = "humantime_serde")]
    pub local_ttl: Option<Duration>,
    /// Remote entry lifetime; None keeps entries until evicted
    #[serde(with = "humantime_serde")]
    pub remote_ttl: Option<Duration>,
    pub overrides: HashMap<String, TierOverride>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            local_capacity: 10_000,
            local_ttl: None,
            remote_ttl: None,
            overrides: HashMap::new(),
        }
    }
}

impl CacheSettings {
    /// Resolve the settings for `name`, applying any override
    pub fn tier_for(&self, name: &str) -> TierSettings {
        let base = TierSettings {
            local_capacity: self.local_capacity,
            local_ttl: self.local_ttl,
            remote_ttl: self.remote_ttl,
        };
        match self.overrides.get(name) {
            Some(o) => TierSettings {
                local_capacity: o.local_capacity.unwrap_or(base.local_capacity),
                local_ttl: o.local_ttl.or(base.local_ttl),
                remote_ttl: o.remote_ttl.or(base.remote_ttl),
            },
            None => base,
        }
    }
}

/// Delayed queue and worker pool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    /// Longest a blocked `take` sleeps before re-checking delayed items
    #[serde(with = "humantime_serde")]
    pub take_poll: Duration,
    /// Pause after a failed `take` before the worker retries
    #[serde(with = "humantime_serde")]
    pub take_error_backoff: Duration,
    /// How long an in-flight consume may run after shutdown is requested
    #[serde(with = "humantime_serde")]
    pub shutdown_grace: Duration,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            take_poll: Duration::from_millis(50),
            take_error_backoff: Duration::from_secs(1),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

/// Background upkeep of backend state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaintenanceSettings {
    /// How often expired entries are swept from an in-process backend
    #[serde(with = "humantime_serde")]
    pub purge_interval: Duration,
}

impl Default for MaintenanceSettings {
    fn default() -> Self {
        Self {
            purge_interval: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
