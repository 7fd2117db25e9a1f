// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rate limiter scenarios

use crate::prelude::settings;
use keel_adapters::FakeBackend;
use keel_core::{FakeClock, KeyType};
use keel_engine::{RateLimitError, RateLimiter, RequestContext};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

fn limiter() -> (RateLimiter<FakeBackend, FakeClock>, FakeClock) {
    let backend = FakeBackend::new();
    let clock = backend.clock().clone();
    (RateLimiter::with_clock(backend, clock.clone()), clock)
}

fn from(last_octet: u8) -> RequestContext {
    RequestContext::new("login").with_ip(IpAddr::V4(Ipv4Addr::new(192, 168, 0, last_octet)))
}

#[tokio::test]
async fn fixed_window_denies_the_sixth_call_then_resets() {
    let settings = settings();
    let rule = settings.rate_limit("login").unwrap();
    let (limiter, clock) = limiter();

    for _ in 0..5 {
        limiter.check_rate_limit(rule, &from(1)).await.unwrap();
    }
    let err = limiter.check_rate_limit(rule, &from(1)).await.unwrap_err();
    assert_eq!(err.to_string(), "too many login attempts");

    clock.advance(Duration::from_secs(1));
    limiter.check_rate_limit(rule, &from(1)).await.unwrap();
}

#[tokio::test]
async fn sliding_window_uses_legacy_count_and_period() {
    let settings = settings();
    let rule = settings.rate_limit("sms").unwrap();
    let (limiter, clock) = limiter();
    let caller = RequestContext::new("sms");

    for _ in 0..3 {
        assert!(limiter.check(rule, &caller).await.unwrap().admitted);
    }
    clock.advance(Duration::from_millis(500));
    let denied = limiter.check(rule, &caller).await.unwrap();
    assert!(!denied.admitted);

    clock.advance(Duration::from_millis(600));
    assert!(limiter.check(rule, &caller).await.unwrap().admitted);
}

#[tokio::test]
async fn per_address_rules_count_callers_separately() {
    let settings = settings();
    let rule = settings
        .rate_limit("login")
        .unwrap()
        .clone()
        .with_key_type(KeyType::IpMethod);
    let (limiter, _) = limiter();

    for _ in 0..5 {
        limiter.check_rate_limit(&rule, &from(1)).await.unwrap();
    }
    assert!(matches!(
        limiter.check_rate_limit(&rule, &from(1)).await,
        Err(RateLimitError::Exceeded { .. })
    ));
    limiter.check_rate_limit(&rule, &from(2)).await.unwrap();
}

#[tokio::test]
async fn guarded_operation_runs_only_when_admitted() {
    let settings = settings();
    let rule = settings.rate_limit("login").unwrap();
    let (limiter, _) = limiter();
    let mut sent = 0;

    for _ in 0..7 {
        if limiter
            .guard(rule, &from(1), || async { "sent" })
            .await
            .is_ok()
        {
            sent += 1;
        }
    }
    assert_eq!(sent, 5);
}
