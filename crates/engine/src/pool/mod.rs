// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Delayed-queue worker pool
//!
//! One long-running worker per enabled job. Each worker blocks on its queue,
//! consumes one item at a time, and keeps going when an attempt fails or
//! panics. Shutdown cancels every worker and waits for in-flight attempts
//! (bounded by `shutdown_grace`).

mod job;
mod worker;

pub use job::{DelayedJob, DelayedQueue, JobContext, JobItem};

use crate::error::PoolError;
use keel_adapters::QueueAdapter;
use keel_core::{Clock, JobRecord, QueueSettings, SystemClock};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use worker::Worker;

pub(crate) type Records = Arc<Mutex<BTreeMap<String, JobRecord>>>;

pub struct WorkerPool<B, C = SystemClock> {
    backend: B,
    clock: C,
    settings: QueueSettings,
    jobs: Vec<Arc<dyn DelayedJob>>,
    records: Records,
    cancel: CancellationToken,
    workers: Vec<JoinHandle<()>>,
    started: bool,
}

impl<B: QueueAdapter> WorkerPool<B, SystemClock> {
    pub fn new(backend: B, settings: QueueSettings) -> Self {
        Self::with_clock(backend, settings, SystemClock)
    }
}

impl<B: QueueAdapter, C: Clock> WorkerPool<B, C> {
    pub fn with_clock(backend: B, settings: QueueSettings, clock: C) -> Self {
        Self {
            backend,
            clock,
            settings,
            jobs: Vec::new(),
            records: Arc::new(Mutex::new(BTreeMap::new())),
            cancel: CancellationToken::new(),
            workers: Vec::new(),
            started: false,
        }
    }

    /// Add a job; only allowed before [`WorkerPool::start`]
    pub fn register(&mut self, job: impl DelayedJob) -> Result<(), PoolError> {
        self.register_shared(Arc::new(job))
    }

    pub fn register_shared(&mut self, job: Arc<dyn DelayedJob>) -> Result<(), PoolError> {
        if self.started {
            return Err(PoolError::AlreadyStarted);
        }
        if job.queue_key().is_empty() {
            return Err(PoolError::InvalidQueue);
        }
        let name = job.name().to_string();
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        if records.contains_key(&name) {
            return Err(PoolError::DuplicateJob(name));
        }
        records.insert(
            name.clone(),
            JobRecord::new(&name, job.queue_key(), job.is_enabled(), &self.clock),
        );
        drop(records);
        self.jobs.push(job);
        Ok(())
    }

    /// Spawn one worker per enabled job; returns how many were started
    pub fn start(&mut self) -> Result<usize, PoolError> {
        if self.started {
            return Err(PoolError::AlreadyStarted);
        }
        self.started = true;

        for job in &self.jobs {
            let span = tracing::info_span!("job", job = %job.name(), queue = %job.queue_key());
            if !job.is_enabled() {
                span.in_scope(|| tracing::info!("job disabled, not started"));
                continue;
            }
            if let Some(record) = self
                .records
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .get_mut(job.name())
            {
                record.start(&self.clock);
            }
            let worker = Worker {
                job: Arc::clone(job),
                backend: self.backend.clone(),
                clock: self.clock.clone(),
                settings: self.settings.clone(),
                records: Arc::clone(&self.records),
                cancel: self.cancel.clone(),
            };
            self.workers.push(tokio::spawn(worker.run().instrument(span)));
        }

        tracing::info!(
            workers = self.workers.len(),
            registered = self.jobs.len(),
            "worker pool started"
        );
        Ok(self.workers.len())
    }

    /// Snapshot of every registered job, ordered by name
    pub fn status(&self) -> Vec<JobRecord> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect()
    }

    pub fn job_status(&self, name: &str) -> Option<JobRecord> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn is_running(&self) -> bool {
        self.started && !self.cancel.is_cancelled()
    }

    /// Token that stops the pool when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel every worker and wait for them to exit
    pub async fn shutdown(&mut self) {
        self.cancel.cancel();
        {
            let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
            for record in records.values_mut() {
                record.stopping();
            }
        }

        let workers = std::mem::take(&mut self.workers);
        let count = workers.len();
        for handle in workers {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "worker exited abnormally");
            }
        }
        tracing::info!(workers = count, "worker pool stopped");
    }

    /// Start (if needed), then run until SIGINT, SIGTERM or the
    /// cancellation token fires, then shut down
    pub async fn run_until_signal(&mut self) -> Result<(), PoolError> {
        if !self.started {
            self.start()?;
        }
        wait_for_signal(&self.cancel).await?;
        self.shutdown().await;
        Ok(())
    }
}

impl<B, C> Drop for WorkerPool<B, C> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(unix)]
async fn wait_for_signal(cancel: &CancellationToken) -> Result<(), PoolError> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    tokio::select! {
        _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => tracing::info!("received SIGINT, shutting down"),
        _ = cancel.cancelled() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn wait_for_signal(cancel: &CancellationToken) -> Result<(), PoolError> {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("received ctrl-c, shutting down");
        }
        _ = cancel.cancelled() => {}
    }
    Ok(())
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
