// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-job consume loop

use super::job::{DelayedJob, JobContext, JobItem};
use super::Records;
use keel_adapters::QueueAdapter;
use keel_core::{Clock, JobRecord, QueueSettings};
use std::sync::Arc;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

/// Drains one queue until cancelled
pub(super) struct Worker<B, C> {
    pub(super) job: Arc<dyn DelayedJob>,
    pub(super) backend: B,
    pub(super) clock: C,
    pub(super) settings: QueueSettings,
    pub(super) records: Records,
    pub(super) cancel: CancellationToken,
}

impl<B: QueueAdapter, C: Clock> Worker<B, C> {
    pub(super) async fn run(self) {
        let queue = self.job.queue_key().to_string();
        tracing::info!("worker started");

        loop {
            let taken = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                taken = self.backend.take(&queue) => taken,
            };

            let payload = match taken {
                Ok(payload) => payload,
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        backoff_ms = self.settings.take_error_backoff.as_millis() as u64,
                        "take failed"
                    );
                    tokio::select! {
                        _ = self.cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.settings.take_error_backoff) => continue,
                    }
                }
            };

            self.update(|record, clock| record.item_received(clock));
            let succeeded = self
                .attempt(JobItem {
                    queue: queue.clone(),
                    payload,
                })
                .await;
            self.finally().await;
            self.update(|record, clock| record.item_finished(succeeded, clock));
        }

        self.update(|record, clock| {
            record.stopping();
            record.stopped(clock);
        });
        tracing::info!("worker stopped");
    }

    /// Run one consume in its own task so a panic stays contained
    async fn attempt(&self, item: JobItem) -> bool {
        let job = Arc::clone(&self.job);
        let ctx = JobContext::new(job.name(), self.cancel.clone());
        let mut task = tokio::spawn(async move { job.consume(item, ctx).await });

        let joined = tokio::select! {
            joined = &mut task => joined,
            _ = self.cancel.cancelled() => {
                self.update(|record, _| record.stopping());
                match tokio::time::timeout(self.settings.shutdown_grace, &mut task).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        task.abort();
                        tracing::warn!(
                            grace_ms = self.settings.shutdown_grace.as_millis() as u64,
                            "consume aborted after shutdown grace"
                        );
                        return false;
                    }
                }
            }
        };

        match joined {
            Ok(Ok(())) => {
                tracing::debug!("item processed");
                true
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "consume failed");
                false
            }
            Err(e) => {
                log_join_error("consume", &e);
                false
            }
        }
    }

    async fn finally(&self) {
        let job = Arc::clone(&self.job);
        if let Err(e) = tokio::spawn(async move { job.on_finally().await }).await {
            log_join_error("on_finally", &e);
        }
    }

    fn update(&self, f: impl FnOnce(&mut JobRecord, &C)) {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(record) = records.get_mut(self.job.name()) {
            f(record, &self.clock);
        }
    }
}

fn log_join_error(stage: &str, e: &JoinError) {
    if e.is_panic() {
        tracing::error!(stage, "job panicked");
    } else {
        tracing::warn!(stage, error = %e, "job task cancelled");
    }
}
