// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identity generation for lock holders

use crate::lock::HolderId;

/// Generates unique identifiers
pub trait IdGen: Clone + Send + Sync + 'static {
    fn next(&self) -> String;

    /// Mint a fresh lock-holder identity
    fn next_holder(&self) -> HolderId {
        HolderId::new(self.next())
    }
}

/// UUID-based ID generator; unique across processes sharing a backend
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidIdGen;

impl IdGen for UuidIdGen {
    fn next(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}
