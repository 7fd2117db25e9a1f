// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Delayed-job lifecycle state machine
//!
//! `Registered -> Running -> (Processing -> Running)* -> Stopping -> Stopped`

use crate::clock::Clock;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Known to the pool but never started (disabled, or pool not started)
    Registered,
    /// Worker is blocked on its queue, waiting for an item
    Running,
    /// Worker is consuming an item
    Processing,
    /// Cancellation observed; worker is finishing its current attempt
    Stopping,
    /// Worker loop has exited
    Stopped,
}

/// Bookkeeping for one registered job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub name: String,
    pub queue: String,
    pub enabled: bool,
    pub state: JobState,
    /// Attempts that returned normally
    pub processed: u64,
    /// Attempts that failed, panicked or were cancelled
    pub failed: u64,
    #[serde(skip, default = "Instant::now")]
    pub last_active: Instant,
}

impl JobRecord {
    pub fn new(
        name: impl Into<String>,
        queue: impl Into<String>,
        enabled: bool,
        clock: &impl Clock,
    ) -> Self {
        Self {
            name: name.into(),
            queue: queue.into(),
            enabled,
            state: JobState::Registered,
            processed: 0,
            failed: 0,
            last_active: clock.now(),
        }
    }

    /// Worker spawned and waiting on its queue
    pub fn start(&mut self, clock: &impl Clock) {
        if self.state == JobState::Registered {
            self.state = JobState::Running;
            self.last_active = clock.now();
        }
    }

    /// An item was taken from the queue
    pub fn item_received(&mut self, clock: &impl Clock) {
        if self.state == JobState::Running {
            self.state = JobState::Processing;
            self.last_active = clock.now();
        }
    }

    /// The attempt for the current item ended
    pub fn item_finished(&mut self, succeeded: bool, clock: &impl Clock) {
        if succeeded {
            self.processed += 1;
        } else {
            self.failed += 1;
        }
        if self.state == JobState::Processing {
            self.state = JobState::Running;
        }
        self.last_active = clock.now();
    }

    /// Cancellation was requested
    pub fn stopping(&mut self) {
        if matches!(self.state, JobState::Running | JobState::Processing) {
            self.state = JobState::Stopping;
        }
    }

    /// Worker loop exited
    pub fn stopped(&mut self, clock: &impl Clock) {
        if self.state != JobState::Registered {
            self.state = JobState::Stopped;
            self.last_active = clock.now();
        }
    }

    /// Whether the worker loop is alive
    pub fn is_running(&self) -> bool {
        matches!(
            self.state,
            JobState::Running | JobState::Processing | JobState::Stopping
        )
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
