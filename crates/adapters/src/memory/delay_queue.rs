// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Due-time ordered queue

use std::collections::BTreeMap;
use std::time::Instant;

/// Items ordered by due time, FIFO among items due at the same instant
#[derive(Debug, Default)]
pub(crate) struct DelayQueue {
    items: BTreeMap<(Instant, u64), Vec<u8>>,
    seq: u64,
}

impl DelayQueue {
    pub(crate) fn push(&mut self, due: Instant, item: Vec<u8>) {
        self.seq += 1;
        self.items.insert((due, self.seq), item);
    }

    /// Remove the earliest item if it is due at `now`
    pub(crate) fn pop_due(&mut self, now: Instant) -> Option<Vec<u8>> {
        let (&(due, _), _) = self.items.first_key_value()?;
        if due > now {
            return None;
        }
        self.items.pop_first().map(|(_, item)| item)
    }

    pub(crate) fn next_due(&self) -> Option<Instant> {
        self.items.keys().next().map(|&(due, _)| due)
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
#[path = "delay_queue_tests.rs"]
mod tests;
