// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the coordination primitives

use keel_adapters::BackendError;
use thiserror::Error;

/// Boxed error returned by user-supplied loaders and jobs
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors from distributed lock operations
///
/// Failing to acquire is not an error; acquisition methods return `false`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LockError {
    #[error("lock key must not be empty")]
    InvalidKey,
    #[error("interrupted while waiting for lock {key}")]
    Interrupted { key: String },
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Errors from two-tier cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache key must not be empty")]
    InvalidKey,
    #[error("value retrieval failed for key {key}: {source}")]
    ValueRetrieval {
        key: String,
        #[source]
        source: BoxError,
    },
    #[error("cached value for key {key} is not a {expected}: {source}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode value for key {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to decode remote value for key {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("lock error: {0}")]
    Lock(#[from] LockError),
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Errors from rate-limit checks
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RateLimitError {
    /// Request denied; `message` is the rule's configured text
    #[error("{message}")]
    Exceeded { message: String },
    #[error("cannot derive rate-limit key: {0}")]
    InvalidKey(String),
    #[error("invalid rate-limit rule: {0}")]
    InvalidRule(String),
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Errors from worker pool management and delayed-queue producers
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("worker pool already started")]
    AlreadyStarted,
    #[error("job already registered: {0}")]
    DuplicateJob(String),
    #[error("queue key must not be empty")]
    InvalidQueue,
    #[error("failed to encode item for queue {queue}: {source}")]
    Encode {
        queue: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("signal handler error: {0}")]
    Signal(#[from] std::io::Error),
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Errors returned by a job's consume callback
#[derive(Debug, Error)]
pub enum JobError {
    #[error("failed to decode item from {queue}: {source}")]
    Decode {
        queue: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    Failed(String),
    #[error("{0}")]
    Other(#[from] BoxError),
}

impl JobError {
    pub fn failed(message: impl Into<String>) -> Self {
        JobError::Failed(message.into())
    }
}
