// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The coalesced envelope flushed to each Push Broadcaster subscriber every
//! `BATCH_WINDOW_MS`.

use aleph_core::Event;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushEnvelope {
    pub events: Vec<Event>,
    pub flushed_at: u64,
}

impl PushEnvelope {
    pub fn new(events: Vec<Event>, flushed_at: u64) -> Self {
        Self { events, flushed_at }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
#[path = "push_tests.rs"]
mod tests;
