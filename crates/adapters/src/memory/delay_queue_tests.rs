// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

#[test]
fn items_due_together_come_out_in_push_order() {
    let now = Instant::now();
    let mut queue = DelayQueue::default();
    queue.push(now, b"a".to_vec());
    queue.push(now, b"b".to_vec());
    queue.push(now, b"c".to_vec());

    assert_eq!(queue.pop_due(now), Some(b"a".to_vec()));
    assert_eq!(queue.pop_due(now), Some(b"b".to_vec()));
    assert_eq!(queue.pop_due(now), Some(b"c".to_vec()));
    assert_eq!(queue.pop_due(now), None);
}

#[test]
fn future_items_wait_for_their_due_time() {
    let now = Instant::now();
    let mut queue = DelayQueue::default();
    queue.push(now + Duration::from_secs(5), b"later".to_vec());
    queue.push(now, b"now".to_vec());

    assert_eq!(queue.pop_due(now), Some(b"now".to_vec()));
    assert_eq!(queue.pop_due(now), None);
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.next_due(), Some(now + Duration::from_secs(5)));

    assert_eq!(
        queue.pop_due(now + Duration::from_secs(5)),
        Some(b"later".to_vec())
    );
    assert!(queue.next_due().is_none());
}
