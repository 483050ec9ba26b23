// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup reconciliation: a job left `running` across a restart has no
//! worker left to finish it, since the Worker Runtime held no durable claim
//! beyond the process that spawned it. Every such job is failed with
//! `kind = "interrupted"` before the scheduler is handed the store.

use aleph_core::{AlephError, Clock, ErrorClassification, Event, JobError};
use aleph_storage::JobStore;
use tracing::warn;

use crate::bus::EventBus;

/// Error kind attached to jobs reconciled as orphaned after an unclean
/// shutdown.
pub const INTERRUPTED_KIND: &str = "interrupted";

/// Fails every job still `running` from a previous process, publishing
/// `job:failed` for each. Returns the number reconciled.
pub async fn reconcile_interrupted_jobs(
    store: &dyn JobStore,
    bus: &EventBus,
    clock: &impl Clock,
) -> Result<usize, AlephError> {
    let orphans = store.list_running().await?;
    let now = clock.epoch_ms();

    for job in &orphans {
        warn!(job_id = %job.id, pipeline_id = %job.pipeline_id, "reconciling job left running across restart");
        let job_id = job.id.clone();
        let error = JobError {
            kind: INTERRUPTED_KIND.to_string(),
            message: "job was still running when the daemon restarted".to_string(),
            stack: None,
            classification: ErrorClassification::Terminal,
        };
        let to_store = error.clone();
        let updated = store
            .transition(&job_id, Box::new(move |j| j.fail(to_store, now)))
            .await?;
        bus.publish(Event::JobFailed { job_id: updated.id, pipeline_id: updated.pipeline_id, error }).await;
    }

    Ok(orphans.len())
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
