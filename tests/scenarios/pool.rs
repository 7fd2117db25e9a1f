// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Delayed queue worker pool scenarios

use crate::prelude::{eventually, settings};
use async_trait::async_trait;
use keel_adapters::MemoryBackend;
use keel_core::{JobState, SystemClock};
use keel_engine::{DelayedJob, DelayedQueue, JobContext, JobError, JobItem, WorkerPool};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct OrderTimeout {
    order_id: u64,
}

#[derive(Clone, Default)]
struct Cancellations {
    cancelled: Arc<Mutex<Vec<u64>>>,
    attempts: Arc<AtomicUsize>,
}

struct CancelUnpaidOrders {
    out: Cancellations,
}

#[async_trait]
impl DelayedJob for CancelUnpaidOrders {
    fn queue_key(&self) -> &str {
        "orders:timeout"
    }

    fn name(&self) -> &str {
        "cancel-unpaid-orders"
    }

    async fn consume(&self, item: JobItem, _ctx: JobContext) -> Result<(), JobError> {
        let order: OrderTimeout = item.decode()?;
        if order.order_id == 0 {
            return Err(JobError::failed("order 0 does not exist"));
        }
        self.out.cancelled.lock().unwrap().push(order.order_id);
        Ok(())
    }

    async fn on_finally(&self) {
        self.out.attempts.fetch_add(1, Ordering::SeqCst);
    }
}

struct Disabled;

#[async_trait]
impl DelayedJob for Disabled {
    fn queue_key(&self) -> &str {
        "reports"
    }

    fn is_enabled(&self) -> bool {
        false
    }

    async fn consume(&self, _item: JobItem, _ctx: JobContext) -> Result<(), JobError> {
        Err(JobError::failed("disabled job must not run"))
    }
}

fn backend() -> MemoryBackend {
    MemoryBackend::from_settings(SystemClock, &settings().queue)
}

#[tokio::test]
async fn worker_survives_a_failed_item_and_finally_runs_for_each() {
    let backend = backend();
    let out = Cancellations::default();
    let mut pool = WorkerPool::new(backend.clone(), settings().queue);
    pool.register(CancelUnpaidOrders { out: out.clone() }).unwrap();
    pool.register(Disabled).unwrap();
    assert_eq!(pool.start().unwrap(), 1);

    let timeouts = DelayedQueue::new(backend, "orders:timeout").unwrap();
    timeouts.push(&OrderTimeout { order_id: 0 }).await.unwrap();
    timeouts.push(&OrderTimeout { order_id: 17 }).await.unwrap();

    eventually("two attempts", || out.attempts.load(Ordering::SeqCst) == 2).await;
    assert_eq!(*out.cancelled.lock().unwrap(), vec![17]);
    assert!(pool.is_running());

    pool.shutdown().await;
    let status = pool.status();
    let names: Vec<_> = status.iter().map(|r| (r.name.as_str(), r.state)).collect();
    assert_eq!(
        names,
        vec![
            ("cancel-unpaid-orders", JobState::Stopped),
            ("reports", JobState::Registered),
        ]
    );
    assert_eq!((status[0].processed, status[0].failed), (1, 1));
}

#[tokio::test]
async fn delayed_offer_is_consumed_after_its_delay() {
    let backend = backend();
    let out = Cancellations::default();
    let mut pool = WorkerPool::new(backend.clone(), settings().queue);
    pool.register(CancelUnpaidOrders { out: out.clone() }).unwrap();
    pool.start().unwrap();

    let timeouts = DelayedQueue::new(backend, "orders:timeout").unwrap();
    timeouts
        .offer(&OrderTimeout { order_id: 5 }, Duration::from_millis(80))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(out.cancelled.lock().unwrap().is_empty());

    eventually("delayed item", || *out.cancelled.lock().unwrap() == vec![5]).await;
    pool.shutdown().await;
}

#[tokio::test]
async fn shutdown_stops_idle_workers_promptly() {
    let backend = backend();
    let mut pool = WorkerPool::new(backend, settings().queue);
    pool.register(CancelUnpaidOrders {
        out: Cancellations::default(),
    })
    .unwrap();
    pool.start().unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    tokio::time::timeout(Duration::from_secs(1), pool.shutdown())
        .await
        .unwrap();
    assert!(pool.status().iter().all(|r| r.state == JobState::Stopped));
}
