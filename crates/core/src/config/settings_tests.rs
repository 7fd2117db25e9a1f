// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::config::{Algorithm, KeyType};
use crate::TimeUnit;
use std::io::Write;

const FULL: &str = r#"
[lock]
retry_interval = "20ms"
default_lease = "30s"

[cache]
local_capacity = 500
local_ttl = "5m"
remote_ttl = "1h"

[cache.overrides.users]
local_capacity = 100

[cache.overrides.sessions]
remote_ttl = "10m"

[queue]
take_poll = "10ms"
take_error_backoff = "250ms"
shutdown_grace = "2s"

[maintenance]
purge_interval = "15s"

[[rate_limit]]
prefix = "rl:"
key = "login"
limit = 5
window = 1
unit = "seconds"
algorithm = "fixed_window"
key_type = "ip"
message = "too many login attempts"

[[rate_limit]]
key = "sms"
count = 1
period = 1
unit = "minutes"
algorithm = "sliding_window"
"#;

#[test]
fn empty_document_uses_defaults() {
    let settings = Settings::from_toml("").unwrap();
    assert_eq!(settings.lock.retry_interval, Duration::from_millis(50));
    assert!(settings.lock.default_lease.is_none());
    assert_eq!(settings.cache.local_capacity, 10_000);
    assert_eq!(settings.queue.take_poll, Duration::from_millis(50));
    assert_eq!(settings.maintenance.purge_interval, Duration::from_secs(30));
    assert!(settings.rate_limits.is_empty());
}

#[test]
fn full_document_parses() {
    let settings = Settings::from_toml(FULL).unwrap();

    assert_eq!(settings.lock.retry_interval, Duration::from_millis(20));
    assert_eq!(settings.lock.default_lease, Some(Duration::from_secs(30)));
    assert_eq!(settings.queue.shutdown_grace, Duration::from_secs(2));
    assert_eq!(settings.maintenance.purge_interval, Duration::from_secs(15));

    let login = settings.rate_limit("login").unwrap();
    assert_eq!(login.key_type, KeyType::Ip);
    assert_eq!(login.message, "too many login attempts");

    let sms = settings.rate_limit("sms").unwrap();
    assert_eq!(sms.limit, 1);
    assert_eq!(sms.unit, TimeUnit::Minutes);
    assert_eq!(sms.algorithm, Algorithm::SlidingWindow);
    assert_eq!(sms.window_duration(), Duration::from_secs(60));
}

#[test]
fn overrides_inherit_unset_fields() {
    let settings = Settings::from_toml(FULL).unwrap();

    let users = settings.cache.tier_for("users");
    assert_eq!(users.local_capacity, 100);
    assert_eq!(users.local_ttl, Some(Duration::from_secs(300)));
    assert_eq!(users.remote_ttl, Some(Duration::from_secs(3_600)));

    let sessions = settings.cache.tier_for("sessions");
    assert_eq!(sessions.local_capacity, 500);
    assert_eq!(sessions.remote_ttl, Some(Duration::from_secs(600)));

    let other = settings.cache.tier_for("anything-else");
    assert_eq!(other.local_capacity, 500);
}

#[test]
fn invalid_rule_is_reported_with_index() {
    let err = Settings::from_toml(
        r#"
        [[rate_limit]]
        key = "ok"
        limit = 1

        [[rate_limit]]
        key = "broken"
        limit = 0
        "#,
    )
    .unwrap_err();

    assert!(
        err.to_string().contains("rate_limit[1]"),
        "unexpected error: {}",
        err
    );
}

#[test]
fn zero_retry_interval_is_rejected() {
    let err = Settings::from_toml("[lock]\nretry_interval = \"0s\"").unwrap_err();
    assert!(matches!(err, SettingsError::Invalid { ref field, .. } if field == "lock.retry_interval"));
}

#[test]
fn zero_purge_interval_is_rejected() {
    let err = Settings::from_toml("[maintenance]\npurge_interval = \"0s\"").unwrap_err();
    assert!(
        matches!(err, SettingsError::Invalid { ref field, .. } if field == "maintenance.purge_interval")
    );
}

#[test]
fn zero_capacity_override_is_rejected() {
    let err = Settings::from_toml("[cache.overrides.users]\nlocal_capacity = 0").unwrap_err();
    assert!(err.to_string().contains("cache.overrides.users"));
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let err = Settings::from_toml("[lock\nretry_interval = ").unwrap_err();
    assert!(matches!(err, SettingsError::Toml(_)));
}

#[test]
fn load_reads_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(FULL.as_bytes()).unwrap();

    let settings = Settings::load(file.path()).unwrap();
    assert_eq!(settings.rate_limits.len(), 2);
}

#[test]
fn load_reports_missing_file() {
    let err = Settings::load(Path::new("/nonexistent/keel.toml")).unwrap_err();
    assert!(matches!(err, SettingsError::Io { .. }));
}
