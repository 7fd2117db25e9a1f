// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Distributed lock scenarios

use crate::prelude::settings;
use keel_adapters::{FakeBackend, MemoryBackend, TracedBackend};
use keel_core::{HolderId, TimeUnit};
use keel_engine::{LockError, LockTemplate, Locker};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn only_one_holder_wins_a_contended_try_lock() {
    let backend = TracedBackend::new(MemoryBackend::new());
    let settings = settings();
    let first = Locker::new(backend.clone(), &settings.lock);

    let contenders: Vec<_> = (0..8).map(|_| first.fork()).collect();
    let handles: Vec<_> = contenders
        .into_iter()
        .map(|locker| tokio::spawn(async move { locker.try_lock("invoice:42").await.unwrap() }))
        .collect();

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn holder_reenters_and_releases_after_matching_unlocks() {
    let backend = MemoryBackend::new();
    let settings = settings();
    let mine = Locker::new(backend.clone(), &settings.lock).with_holder(HolderId::new("mine"));
    let theirs = mine.fork();

    mine.lock("report").await.unwrap();
    assert!(mine.try_lock("report").await.unwrap());
    assert!(!theirs.try_lock("report").await.unwrap());

    mine.unlock("report").await.unwrap();
    assert!(!theirs.try_lock("report").await.unwrap());
    mine.unlock("report").await.unwrap();
    assert!(theirs.try_lock("report").await.unwrap());
}

#[tokio::test]
async fn expired_lease_frees_the_lock_without_an_unlock() {
    let backend = FakeBackend::new();
    let settings = settings();
    let crashed = Locker::new(backend.clone(), &settings.lock);
    let survivor = crashed.fork();

    crashed.lock_for("nightly", 2, TimeUnit::Seconds).await.unwrap();
    assert!(!survivor.try_lock("nightly").await.unwrap());

    backend.clock().advance(Duration::from_secs(2));
    assert!(survivor.try_lock("nightly").await.unwrap());
}

#[tokio::test]
async fn unlock_if_is_safe_whether_or_not_the_lock_was_taken() {
    let backend = MemoryBackend::new();
    let settings = settings();
    let mine = Locker::new(backend.clone(), &settings.lock);
    let theirs = mine.fork();

    theirs.lock("sync").await.unwrap();
    let locked = mine.try_lock("sync").await.unwrap();
    assert!(!locked);

    mine.unlock_if(locked, "sync").await.unwrap();
    mine.unlock_if(true, "sync").await.unwrap();
    assert!(theirs.is_held_by_current("sync").await.unwrap());

    theirs.unlock_if(true, "sync").await.unwrap();
    theirs.unlock_if(true, "sync").await.unwrap();
    assert!(!mine.is_locked("sync").await.unwrap());
}

#[tokio::test]
async fn template_serializes_work_across_holders() {
    let backend = MemoryBackend::new();
    let settings = settings();
    let base = Locker::new(backend.clone(), &settings.lock);
    let running = Arc::new(AtomicUsize::new(0));
    let overlapped = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let template = LockTemplate::new(base.fork());
            let running = Arc::clone(&running);
            let overlapped = Arc::clone(&overlapped);
            tokio::spawn(async move {
                template
                    .execute_for(
                        "ledger",
                        2,
                        5,
                        TimeUnit::Seconds,
                        |locked| async move {
                            assert!(locked);
                            if running.fetch_add(1, Ordering::SeqCst) > 0 {
                                overlapped.fetch_add(1, Ordering::SeqCst);
                            }
                            tokio::time::sleep(Duration::from_millis(10)).await;
                            running.fetch_sub(1, Ordering::SeqCst);
                            Ok::<_, String>(())
                        },
                        |e| panic!("unexpected failure: {e:?}"),
                    )
                    .await
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap(), Some(()));
    }
    assert_eq!(overlapped.load(Ordering::SeqCst), 0);
    assert!(!base.is_locked("ledger").await.unwrap());
}

#[tokio::test]
async fn shutdown_interrupts_a_waiting_acquire() {
    let backend = MemoryBackend::new();
    let settings = settings();
    let token = CancellationToken::new();
    let holder = Locker::new(backend.clone(), &settings.lock);
    let waiter = holder.fork().with_cancellation(token.clone());

    holder.lock("migration").await.unwrap();
    let waiting = tokio::spawn(async move {
        waiter
            .try_lock_within("migration", Duration::from_secs(5), None)
            .await
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    token.cancel();

    let err = waiting.await.unwrap().unwrap_err();
    assert_eq!(
        err,
        LockError::Interrupted {
            key: "migration".to_string()
        }
    );
}
