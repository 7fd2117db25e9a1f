// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration modules

mod rate_limit;
mod settings;

pub use rate_limit::{Algorithm, KeyType, RateLimitRule};
pub use settings::{
    CacheSettings, LockSettings, MaintenanceSettings, QueueSettings, Settings, SettingsError,
    TierOverride, TierSettings,
};
