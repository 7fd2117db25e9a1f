// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Two-tier cache scenarios

use crate::prelude::settings;
use keel_adapters::{BackendCall, BackendOp, FakeBackend, KeyValueAdapter, MemoryBackend};
use keel_engine::{CacheError, CacheRegistry, Locker};
use serde::{Deserialize, Serialize};
use similar_asserts::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Profile {
    id: u64,
    email: String,
}

fn profile(id: u64) -> Profile {
    Profile {
        id,
        email: format!("user{id}@example.com"),
    }
}

#[tokio::test]
async fn read_through_loads_once_per_key() {
    let registry = CacheRegistry::new(MemoryBackend::new(), settings().cache);
    let users = registry.get_cache("users");
    let loads = AtomicUsize::new(0);

    for _ in 0..3 {
        let loaded: Profile = users
            .get_or_load("7", || async {
                loads.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(profile(7))
            })
            .await
            .unwrap();
        assert_eq!(loaded, profile(7));
    }
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn processes_sharing_a_backend_see_each_others_writes() {
    let backend = MemoryBackend::new();
    let settings = settings();
    let here = CacheRegistry::new(backend.clone(), settings.cache.clone());
    let there = CacheRegistry::new(backend, settings.cache);

    here.get_cache("users").put("1", &profile(1)).await.unwrap();

    let seen: Option<Profile> = there.get_cache("users").get_as("1").await.unwrap();
    assert_eq!(seen, Some(profile(1)));
    assert_eq!(there.get_cache("users").stats().remote_hits, 1);
}

#[tokio::test]
async fn failed_remote_write_is_never_served_locally() {
    let backend = FakeBackend::new();
    let registry = CacheRegistry::new(backend.clone(), settings().cache);
    let users = registry.get_cache("users");
    backend.fail(BackendOp::Set);

    let err = users.put("1", &profile(1)).await.unwrap_err();
    assert!(matches!(err, CacheError::Backend(_)));

    backend.recover(BackendOp::Set);
    assert_eq!(users.get("1").await.unwrap(), None);
}

#[tokio::test]
async fn cache_names_are_isolated_and_configured_separately() {
    let backend = FakeBackend::new();
    let registry = CacheRegistry::new(backend.clone(), settings().cache);

    registry.get_cache("sessions").put("abc", &"token").await.unwrap();
    registry.get_cache("users").put("abc", &profile(1)).await.unwrap();
    registry.get_cache("users").clear().await.unwrap();

    assert!(registry.get_cache("sessions").get("abc").await.unwrap().is_some());
    assert!(registry.get_cache("users").get("abc").await.unwrap().is_none());

    let ttls: Vec<_> = backend
        .calls_of(BackendOp::Set)
        .into_iter()
        .filter_map(|call| match call {
            BackendCall::Set { key, ttl } => Some((key, ttl)),
            _ => None,
        })
        .collect();
    assert_eq!(
        ttls,
        vec![
            ("sessions::abc".to_string(), Some(Duration::from_secs(30))),
            ("users::abc".to_string(), None),
        ]
    );
}

#[tokio::test]
async fn concurrent_locked_loads_run_the_loader_once() {
    let backend = MemoryBackend::new();
    let settings = settings();
    let registry = CacheRegistry::new(backend.clone(), settings.cache);
    let base = Locker::new(backend.clone(), &settings.lock);
    let loads = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let users = registry.get_cache("users");
            let locker = base.fork();
            let loads = Arc::clone(&loads);
            tokio::spawn(async move {
                users
                    .get_or_load_locked("9", &locker, Duration::from_secs(2), None, || async {
                        loads.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok::<_, String>(profile(9))
                    })
                    .await
                    .unwrap()
            })
        })
        .collect();

    for handle in handles {
        let loaded: Profile = handle.await.unwrap();
        assert_eq!(loaded, profile(9));
    }
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert!(backend.get("users::9").await.unwrap().is_some());
}
