// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lease-lock record for named, reentrant mutexes
//!
//! This is the per-name state a coordination backend keeps for a mutex. A lock
//! is held by exactly one holder at a time, may be re-entered by that holder,
//! and, when acquired with a lease, stops counting as held once the lease
//! elapses even if the holder never releases it.

use crate::clock::Clock;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Unique identifier for a lock holder
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HolderId(pub String);

impl HolderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for HolderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lock state
#[derive(Clone, Debug)]
pub enum LeaseState {
    /// Lock is available
    Free,
    /// Lock is held by a holder
    Held {
        holder: HolderId,
        /// Re-entry depth, at least 1
        depth: u32,
        acquired_at: Instant,
        /// None means the lock never expires on its own
        expires_at: Option<Instant>,
    },
}

/// Outcome of an acquisition attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Acquire {
    /// Lock was free and is now held
    Granted,
    /// Holder already owned the lock; depth increased
    Reentered { depth: u32 },
    /// Previous holder's lease had run out; lock handed to the caller
    Reclaimed { previous: HolderId },
    /// Lock is held by someone else
    Denied { current: HolderId },
}

impl Acquire {
    pub fn is_acquired(&self) -> bool {
        !matches!(self, Acquire::Denied { .. })
    }
}

/// Outcome of a release attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Release {
    /// Last level released; lock is free
    Released,
    /// One re-entry level released; holder still owns the lock
    Decremented { depth: u32 },
    /// Caller does not hold the lock; nothing changed
    NotHeld,
}

/// A named lease lock
#[derive(Clone, Debug)]
pub struct LeaseLock {
    pub name: String,
    pub state: LeaseState,
}

impl LeaseLock {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: LeaseState::Free,
        }
    }

    fn is_expired(&self, clock: &impl Clock) -> bool {
        match &self.state {
            LeaseState::Held {
                expires_at: Some(deadline),
                ..
            } => clock.now() >= *deadline,
            _ => false,
        }
    }

    /// The live holder, ignoring a holder whose lease has run out
    pub fn holder(&self, clock: &impl Clock) -> Option<&HolderId> {
        match &self.state {
            LeaseState::Held { holder, .. } if !self.is_expired(clock) => Some(holder),
            _ => None,
        }
    }

    pub fn is_locked(&self, clock: &impl Clock) -> bool {
        self.holder(clock).is_some()
    }

    pub fn is_held_by(&self, holder: &HolderId, clock: &impl Clock) -> bool {
        self.holder(clock) == Some(holder)
    }

    /// Current re-entry depth for a live holder, 0 when free
    pub fn depth(&self, clock: &impl Clock) -> u32 {
        match &self.state {
            LeaseState::Held { depth, .. } if !self.is_expired(clock) => *depth,
            _ => 0,
        }
    }

    /// Attempt to acquire for `holder`
    ///
    /// Re-entry replaces the lease: the lock expires `lease` after the most
    /// recent successful acquisition, or never when `lease` is None or too
    /// large to represent as a deadline.
    pub fn acquire(
        &mut self,
        holder: &HolderId,
        lease: Option<Duration>,
        clock: &impl Clock,
    ) -> Acquire {
        let now = clock.now();
        let expires_at = lease.and_then(|l| now.checked_add(l));
        let expired = self.is_expired(clock);

        let (outcome, depth) = match &self.state {
            LeaseState::Free => (Acquire::Granted, 1),
            LeaseState::Held {
                holder: current, ..
            } if expired => {
                if current == holder {
                    (Acquire::Granted, 1)
                } else {
                    (
                        Acquire::Reclaimed {
                            previous: current.clone(),
                        },
                        1,
                    )
                }
            }
            LeaseState::Held {
                holder: current,
                depth,
                ..
            } if current == holder => {
                let depth = depth.saturating_add(1);
                (Acquire::Reentered { depth }, depth)
            }
            LeaseState::Held {
                holder: current, ..
            } => {
                return Acquire::Denied {
                    current: current.clone(),
                }
            }
        };

        self.state = LeaseState::Held {
            holder: holder.clone(),
            depth,
            acquired_at: now,
            expires_at,
        };
        outcome
    }

    /// Release one level for `holder`; never touches another holder's lock
    pub fn release(&mut self, holder: &HolderId, clock: &impl Clock) -> Release {
        if self.is_expired(clock) {
            self.state = LeaseState::Free;
            return Release::NotHeld;
        }
        let depth = match &self.state {
            LeaseState::Held {
                holder: current,
                depth,
                ..
            } if current == holder => *depth,
            _ => return Release::NotHeld,
        };

        if depth > 1 {
            if let LeaseState::Held { depth: d, .. } = &mut self.state {
                *d = depth - 1;
            }
            Release::Decremented { depth: depth - 1 }
        } else {
            self.state = LeaseState::Free;
            Release::Released
        }
    }

    /// Clear an expired lease, returning the holder it belonged to
    pub fn expire(&mut self, clock: &impl Clock) -> Option<HolderId> {
        if !self.is_expired(clock) {
            return None;
        }
        match std::mem::replace(&mut self.state, LeaseState::Free) {
            LeaseState::Held { holder, .. } => Some(holder),
            LeaseState::Free => None,
        }
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
