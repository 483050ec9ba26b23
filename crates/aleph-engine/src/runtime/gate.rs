// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Global concurrency gate: a `tokio::sync::Semaphore` of `C` permits bounding
//! how many jobs may be `running` at once (I2), plus a per-pipeline cap so no
//! single pipeline can starve the others.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Default global concurrency cap.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Bounds total running jobs at `capacity` and, independently, how many of
/// those permits a single pipeline may hold at once.
pub struct Gate {
    permits: Arc<Semaphore>,
    per_pipeline_max: usize,
    held: Arc<Mutex<HashMap<String, usize>>>,
}

/// A held permit, released (and its pipeline's count decremented) on drop.
/// Owns its resources (no borrowed lifetime), so it can freely cross
/// `tokio::spawn` boundaries.
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
    pipeline_id: String,
    held: Arc<Mutex<HashMap<String, usize>>>,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        let mut held = self.held.lock();
        if let Some(count) = held.get_mut(&self.pipeline_id) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                held.remove(&self.pipeline_id);
            }
        }
    }
}

impl Gate {
    pub fn new(capacity: usize, per_pipeline_max: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            per_pipeline_max: per_pipeline_max.max(1),
            held: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Attempts to admit one job from `pipeline_id` without blocking. Returns
    /// `None` if the global cap is exhausted or the pipeline already holds
    /// its maximum share of permits.
    pub fn try_admit(&self, pipeline_id: &str) -> Option<GatePermit> {
        {
            let held = self.held.lock();
            if held.get(pipeline_id).copied().unwrap_or(0) >= self.per_pipeline_max {
                return None;
            }
        }
        let permit = Arc::clone(&self.permits).try_acquire_owned().ok()?;
        let mut held = self.held.lock();
        *held.entry(pipeline_id.to_string()).or_insert(0) += 1;
        Some(GatePermit { _permit: permit, pipeline_id: pipeline_id.to_string(), held: Arc::clone(&self.held) })
    }

    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}

pub fn shared(capacity: usize, per_pipeline_max: usize) -> Arc<Gate> {
    Arc::new(Gate::new(capacity, per_pipeline_max))
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod tests;
