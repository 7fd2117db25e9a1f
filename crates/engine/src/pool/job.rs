// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Delayed jobs and the producer side of their queues

use crate::error::{JobError, PoolError};
use async_trait::async_trait;
use keel_adapters::QueueAdapter;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A long-running consumer bound to one named queue
///
/// Each enabled job gets exactly one worker. A failing or panicking `consume`
/// is logged and the worker moves on to the next item; the item is not
/// redelivered.
#[async_trait]
pub trait DelayedJob: Send + Sync + 'static {
    /// Queue this job drains
    fn queue_key(&self) -> &str;

    /// Name used in logs and status; defaults to the queue key
    fn name(&self) -> &str {
        self.queue_key()
    }

    /// Disabled jobs are registered but never started
    fn is_enabled(&self) -> bool {
        true
    }

    async fn consume(&self, item: JobItem, ctx: JobContext) -> Result<(), JobError>;

    /// Runs after every consume attempt, whatever its outcome
    async fn on_finally(&self) {}
}

/// One item taken from a queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobItem {
    pub queue: String,
    pub payload: Vec<u8>,
}

impl JobItem {
    /// Decode the JSON payload written by [`DelayedQueue::offer`]
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, JobError> {
        serde_json::from_slice(&self.payload).map_err(|source| JobError::Decode {
            queue: self.queue.clone(),
            source,
        })
    }
}

/// Per-attempt context handed to `consume`
#[derive(Debug, Clone)]
pub struct JobContext {
    pub job: String,
    cancel: CancellationToken,
}

impl JobContext {
    pub(crate) fn new(job: impl Into<String>, cancel: CancellationToken) -> Self {
        Self {
            job: job.into(),
            cancel,
        }
    }

    /// Whether the pool is shutting down
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Completes once the pool starts shutting down
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }
}

/// Producer handle for one named queue
#[derive(Clone)]
pub struct DelayedQueue<B> {
    backend: B,
    queue: String,
}

impl<B: QueueAdapter> DelayedQueue<B> {
    pub fn new(backend: B, queue: impl Into<String>) -> Result<Self, PoolError> {
        let queue = queue.into();
        if queue.is_empty() {
            return Err(PoolError::InvalidQueue);
        }
        Ok(Self { backend, queue })
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Enqueue `item`, visible to the consumer once `delay` has elapsed
    pub async fn offer<T: Serialize + ?Sized>(
        &self,
        item: &T,
        delay: Duration,
    ) -> Result<(), PoolError> {
        let payload = serde_json::to_vec(item).map_err(|source| PoolError::Encode {
            queue: self.queue.clone(),
            source,
        })?;
        if delay.is_zero() {
            self.backend.push(&self.queue, payload).await?;
        } else {
            self.backend
                .push_delayed(&self.queue, payload, delay)
                .await?;
        }
        tracing::debug!(queue = %self.queue, delay_ms = delay.as_millis() as u64, "item offered");
        Ok(())
    }

    /// Enqueue `item` for immediate delivery
    pub async fn push<T: Serialize + ?Sized>(&self, item: &T) -> Result<(), PoolError> {
        self.offer(item, Duration::ZERO).await
    }

    /// Items waiting, due or not
    pub async fn len(&self) -> Result<usize, PoolError> {
        Ok(self.backend.len(&self.queue).await?)
    }
}
