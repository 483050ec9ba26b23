// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event Bus: delivers job lifecycle events in FIFO order per job id to
//! three independent sinks (store updater, push broadcaster, metrics
//! aggregator) via one fan-out task, so a slow sink can never block a fast
//! one.

use aleph_core::Event;
use tokio::sync::mpsc;
use tracing::warn;

/// Default bounded capacity for each sink's inbox.
pub const SINK_CAPACITY: usize = 1024;

/// The inbound side of the bus. Cloneable — every effect-producing component
/// (scheduler, runner) holds a sender.
pub struct EventBus {
    inbound: mpsc::Sender<Event>,
}

/// The three sink receivers produced alongside an [`EventBus`]. Each is
/// consumed by its own long-running task (store updater, push broadcaster,
/// metrics aggregator — assembled in `aleph-daemon`).
pub struct EventSinks {
    pub store: mpsc::Receiver<Event>,
    pub push: mpsc::Receiver<Event>,
    pub metrics: mpsc::Receiver<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> (Self, EventSinks) {
        let (inbound_tx, mut inbound_rx) = mpsc::channel(capacity);
        let (store_tx, store_rx) = mpsc::channel(capacity);
        let (push_tx, push_rx) = mpsc::channel(capacity);
        let (metrics_tx, metrics_rx) = mpsc::channel(capacity);

        tokio::spawn(async move {
            while let Some(event) = inbound_rx.recv().await {
                // job:failed (and other critical events) must never be dropped by a
                // full sink inbox, so they go through the blocking send; everything
                // else is best-effort. Per-subscriber drop-oldest-non-critical
                // eviction (I6) happens downstream in the push broadcaster, which
                // owns a real queue it can inspect and prune.
                fan_out(&store_tx, "store", event.clone()).await;
                fan_out(&push_tx, "push", event.clone()).await;
                fan_out(&metrics_tx, "metrics", event).await;
            }
        });

        (Self { inbound: inbound_tx }, EventSinks { store: store_rx, push: push_rx, metrics: metrics_rx })
    }

    pub fn sender(&self) -> mpsc::Sender<Event> {
        self.inbound.clone()
    }

    /// A lightweight handle sharing the same fan-out task, for components
    /// (like the scheduler) that need their own `EventBus` value to clone.
    pub fn clone_sender(&self) -> EventBus {
        EventBus { inbound: self.inbound.clone() }
    }

    pub async fn publish(&self, event: Event) {
        if self.inbound.send(event).await.is_err() {
            warn!("event bus fan-out task has shut down, dropping event");
        }
    }
}

async fn fan_out(tx: &mpsc::Sender<Event>, sink: &'static str, event: Event) {
    if event.is_critical() {
        let _ = tx.send(event).await;
        return;
    }
    if let Err(err) = tx.try_send(event) {
        match err {
            mpsc::error::TrySendError::Full(dropped) => {
                warn!(sink, event = dropped.name(), "sink inbox full, dropping event");
            }
            mpsc::error::TrySendError::Closed(_) => {}
        }
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
