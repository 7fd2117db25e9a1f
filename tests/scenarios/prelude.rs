// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for scenarios

use keel_core::Settings;
use std::io::Write;
use std::time::Duration;

/// Settings tuned for fast tests, loaded through a real file
pub const SETTINGS: &str = r#"
[lock]
retry_interval = "5ms"

[cache]
local_capacity = 100
local_ttl = "1m"

[cache.overrides.sessions]
remote_ttl = "30s"

[queue]
take_poll = "5ms"
take_error_backoff = "10ms"
shutdown_grace = "100ms"

[[rate_limit]]
key = "login"
limit = 5
window = 1
unit = "seconds"
message = "too many login attempts"

[[rate_limit]]
key = "sms"
count = 3
period = 1
unit = "seconds"
algorithm = "sliding_window"
"#;

pub fn settings() -> Settings {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(SETTINGS.as_bytes()).unwrap();
    Settings::load(file.path()).unwrap()
}

/// Poll `condition` for up to a second
pub async fn eventually(what: &str, condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {what}");
}
