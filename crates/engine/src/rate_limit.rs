// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fixed- and sliding-window admission control
//!
//! Every check resolves a resource key from the rule and the request
//! (`prefix + derived key`), then counts against it in the backend:
//! - fixed window: one counter per aligned slot, `increment` with TTL = window
//! - sliding window: an atomic prune-and-admit on a timestamp log

use crate::error::RateLimitError;
use keel_adapters::{CounterAdapter, TimeLogAdapter};
use keel_core::{
    slot_key, slot_remaining, window_slot, Algorithm, Clock, KeyType, RateLimitRule, SystemClock,
};
use std::future::Future;
use std::net::IpAddr;
use std::time::Duration;

/// What the limiter knows about the caller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Identity of the operation being invoked
    pub method: String,
    pub ip: Option<IpAddr>,
}

impl RequestContext {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            ip: None,
        }
    }

    pub fn with_ip(mut self, ip: IpAddr) -> Self {
        self.ip = Some(ip);
        self
    }
}

/// Outcome of one admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub admitted: bool,
    pub limit: u64,
    /// Further requests the current window would admit
    pub remaining: u64,
    /// Zero when admitted; otherwise when a retry may succeed
    pub retry_after: Duration,
}

/// Derive the backend key a request counts against
pub fn resource_key(rule: &RateLimitRule, ctx: &RequestContext) -> Result<String, RateLimitError> {
    let operation = if rule.key.is_empty() {
        ctx.method.as_str()
    } else {
        rule.key.as_str()
    };
    let ip = || {
        ctx.ip
            .ok_or_else(|| RateLimitError::InvalidKey("request has no caller address".to_string()))
    };
    let require_operation = || {
        if operation.is_empty() {
            Err(RateLimitError::InvalidKey(
                "no operation identity".to_string(),
            ))
        } else {
            Ok(operation)
        }
    };

    let derived = match rule.key_type {
        KeyType::Method => require_operation()?.to_string(),
        KeyType::Ip => ip()?.to_string(),
        KeyType::IpMethod => format!("{}:{}", ip()?, require_operation()?),
    };
    Ok(format!("{}{}", rule.prefix, derived))
}

/// Rate limiter over a shared backend
#[derive(Clone)]
pub struct RateLimiter<B, C = SystemClock> {
    backend: B,
    clock: C,
}

impl<B: CounterAdapter + TimeLogAdapter> RateLimiter<B, SystemClock> {
    pub fn new(backend: B) -> Self {
        Self::with_clock(backend, SystemClock)
    }
}

impl<B, C> RateLimiter<B, C>
where
    B: CounterAdapter + TimeLogAdapter,
    C: Clock,
{
    pub fn with_clock(backend: B, clock: C) -> Self {
        Self { backend, clock }
    }

    /// Count this request against `rule` and report whether it is admitted
    pub async fn check(
        &self,
        rule: &RateLimitRule,
        ctx: &RequestContext,
    ) -> Result<RateDecision, RateLimitError> {
        rule.validate().map_err(RateLimitError::InvalidRule)?;
        let resource = resource_key(rule, ctx)?;
        let window = rule.window_duration();
        let now_ms = self.clock.epoch_ms();

        let decision = match rule.algorithm {
            Algorithm::FixedWindow => {
                let slot = window_slot(now_ms, window);
                let count = self
                    .backend
                    .increment(&slot_key(&resource, slot), Some(window))
                    .await?;
                let admitted = count <= rule.limit;
                RateDecision {
                    admitted,
                    limit: rule.limit,
                    remaining: rule.limit.saturating_sub(count),
                    retry_after: if admitted {
                        Duration::ZERO
                    } else {
                        slot_remaining(now_ms, window)
                    },
                }
            }
            Algorithm::SlidingWindow => {
                let outcome = self
                    .backend
                    .admit(&resource, now_ms, window, rule.limit)
                    .await?;
                RateDecision {
                    admitted: outcome.admitted,
                    limit: rule.limit,
                    remaining: rule.limit.saturating_sub(outcome.count),
                    retry_after: outcome.retry_after(now_ms, window),
                }
            }
        };

        if decision.admitted {
            tracing::trace!(key = %resource, remaining = decision.remaining, "admitted");
        } else {
            tracing::info!(
                key = %resource,
                limit = rule.limit,
                algorithm = ?rule.algorithm,
                retry_after_ms = decision.retry_after.as_millis() as u64,
                "rate limit exceeded"
            );
        }
        Ok(decision)
    }

    /// Like [`RateLimiter::check`], but a denial is
    /// [`RateLimitError::Exceeded`] carrying the rule's message
    pub async fn check_rate_limit(
        &self,
        rule: &RateLimitRule,
        ctx: &RequestContext,
    ) -> Result<RateDecision, RateLimitError> {
        let decision = self.check(rule, ctx).await?;
        if !decision.admitted {
            return Err(RateLimitError::Exceeded {
                message: rule.message.clone(),
            });
        }
        Ok(decision)
    }

    /// Run `operation` only if the request is admitted
    pub async fn guard<T, F, Fut>(
        &self,
        rule: &RateLimitRule,
        ctx: &RequestContext,
        operation: F,
    ) -> Result<T, RateLimitError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.check_rate_limit(rule, ctx).await?;
        Ok(operation().await)
    }
}

#[cfg(test)]
#[path = "rate_limit_tests.rs"]
mod tests;
