// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Push Broadcaster (§4.7): fans events out to subscriber sessions, batching
//! each subscriber's queue into one envelope every `BATCH_WINDOW_MS` and
//! enforcing the drop-oldest-non-critical overflow policy (I6: `job:failed`
//! and `retry:exhausted` are never dropped).

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use aleph_core::{Event, BATCH_WINDOW_MS, IDLE_DISCONNECT_MS, SUB_QUEUE_CAP};
use parking_lot::Mutex;
use tokio::sync::Notify;

/// Per-subscriber outbound queue plus the bookkeeping the flush loop and the
/// idle-disconnect check need.
pub struct SubscriberState {
    queue: Mutex<VecDeque<Event>>,
    dropped_count: AtomicU64,
    last_flush_at: AtomicU64,
    notify: Notify,
}

impl SubscriberState {
    fn new(connected_at_ms: u64) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            dropped_count: AtomicU64::new(0),
            last_flush_at: AtomicU64::new(connected_at_ms),
            notify: Notify::new(),
        }
    }

    fn push(&self, event: Event) {
        let mut queue = self.queue.lock();
        if queue.len() >= SUB_QUEUE_CAP {
            if evict_one(&mut queue) {
                self.dropped_count.fetch_add(1, Ordering::Relaxed);
            }
            // else: queue is full of undroppable events (job:failed/retry:exhausted);
            // I6 forbids dropping them, so the queue is allowed to exceed its
            // nominal cap rather than lose one.
        }
        queue.push_back(event);
        drop(queue);
        self.notify.notify_one();
    }

    /// Drains the full queue for one flush. Empty result means nothing to send.
    pub fn drain(&self) -> Vec<Event> {
        self.queue.lock().drain(..).collect()
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    pub fn mark_flushed(&self, now_epoch_ms: u64) {
        self.last_flush_at.store(now_epoch_ms, Ordering::Relaxed);
    }

    pub fn is_idle(&self, now_epoch_ms: u64) -> bool {
        now_epoch_ms.saturating_sub(self.last_flush_at.load(Ordering::Relaxed)) >= IDLE_DISCONNECT_MS
    }

    /// Waits until there is at least one queued event, or `BATCH_WINDOW_MS`
    /// elapses, whichever comes first.
    pub async fn wait_for_batch(&self) {
        tokio::select! {
            _ = self.notify.notified() => {}
            _ = tokio::time::sleep(std::time::Duration::from_millis(BATCH_WINDOW_MS)) => {}
        }
    }
}

fn evict_one(queue: &mut VecDeque<Event>) -> bool {
    if let Some(pos) = queue.iter().position(|e| matches!(e, Event::JobProgress { .. })) {
        queue.remove(pos);
        return true;
    }
    if let Some(pos) = queue.iter().position(|e| matches!(e, Event::PipelineStatus { .. })) {
        queue.remove(pos);
        return true;
    }
    false
}

/// Registry of live subscriber sessions, shared between the websocket
/// handler and the Health Probes' subscriber-count check.
#[derive(Default, Clone)]
pub struct Broadcaster {
    subscribers: Arc<Mutex<HashMap<String, Arc<SubscriberState>>>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, id: String, connected_at_ms: u64) -> Arc<SubscriberState> {
        let state = Arc::new(SubscriberState::new(connected_at_ms));
        self.subscribers.lock().insert(id, Arc::clone(&state));
        state
    }

    pub fn unregister(&self, id: &str) {
        self.subscribers.lock().remove(id);
    }

    /// Fans `event` out to every connected subscriber's queue.
    pub fn publish(&self, event: Event) {
        for state in self.subscribers.lock().values() {
            state.push(event.clone());
        }
    }

    pub fn subscriber_count(&self) -> u32 {
        self.subscribers.lock().len() as u32
    }

    pub fn dropped_count_total(&self) -> u64 {
        self.subscribers.lock().values().map(|s| s.dropped_count()).sum()
    }
}

/// Drives `bus`'s push sink into the broadcaster. Intended to be spawned
/// once at startup, for the lifetime of the process.
pub async fn run_fanout(mut push_rx: tokio::sync::mpsc::Receiver<Event>, broadcaster: Broadcaster) {
    while let Some(event) = push_rx.recv().await {
        broadcaster.publish(event);
    }
}

#[cfg(test)]
#[path = "broadcast_tests.rs"]
mod tests;
