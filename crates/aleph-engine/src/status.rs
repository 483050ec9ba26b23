// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status Aggregator: a pure function deriving the system-wide status
//! document from the registry and store, with no internal mutable state of
//! its own — matching the redesign away from ad-hoc in-memory metrics that
//! disappear on restart.

use std::collections::BTreeSet;

use aleph_core::{AlephError, JobStatus};
use aleph_storage::JobStore;
use aleph_wire::{JobEntry, PipelineHealth, PipelineStatusEntry, RetryMetrics, SystemStatus};

use crate::registry::PipelineRegistry;

/// Window of most-recent jobs a pipeline's `failing` health is derived over.
pub const RECENT_WINDOW: u32 = 50;

/// Buckets currently-scheduled retry attempt numbers into [`RetryMetrics`].
/// `effective_max_attempts` is the ceiling used to compute `nearing_limit`
/// (`attempt >= max - 1`); callers pass the pipeline-specific value when one
/// retry dominates, or the global default otherwise — this function has no
/// opinion on which, it only buckets what it's given.
pub fn retry_metrics(pending_attempts: &[u32], effective_max_attempts: u32) -> RetryMetrics {
    let nearing_threshold = effective_max_attempts.saturating_sub(1);
    let mut metrics = RetryMetrics::default();
    for &attempt in pending_attempts {
        match attempt {
            1 => metrics.attempt_1 += 1,
            2 => metrics.attempt_2 += 1,
            _ => metrics.attempt_3_plus += 1,
        }
        if attempt >= nearing_threshold {
            metrics.nearing_limit += 1;
        }
    }
    metrics
}

/// Derives the `GET /api/status` document. Pipeline ids come from
/// `Registry::ids() ∪ Store::distinctPipelineIds()` only — never fabricated,
/// never defaulted to a single hard-coded pipeline.
pub async fn aggregate(
    registry: &PipelineRegistry,
    store: &dyn JobStore,
    pending_retry_attempts: &[u32],
    effective_max_attempts: u32,
    subscriber_count: u32,
    now_epoch_ms: u64,
) -> Result<SystemStatus, AlephError> {
    let mut ids: BTreeSet<String> = registry.ids().map(str::to_string).collect();
    for id in store.distinct_pipeline_ids().await? {
        ids.insert(id);
    }

    let mut pipelines = Vec::with_capacity(ids.len());
    for pipeline_id in ids {
        let counts = store.counts(&pipeline_id).await?;
        let last_job = store.last_job(&pipeline_id).await?;
        let recent = store.list_by_pipeline(&pipeline_id, RECENT_WINDOW).await?;
        let failed_recent = recent.iter().filter(|j| j.status == JobStatus::Failed).count();
        let completed_recent = recent.iter().filter(|j| j.status == JobStatus::Completed).count();

        let status = match last_job.as_ref().map(|j| j.status) {
            Some(JobStatus::Running) => PipelineHealth::Running,
            Some(JobStatus::Failed) if failed_recent > completed_recent => PipelineHealth::Failing,
            _ => PipelineHealth::Idle,
        };

        pipelines.push(PipelineStatusEntry {
            human_name: registry.human_name(&pipeline_id),
            status,
            queued: counts.queued,
            running: counts.running,
            completed: counts.completed,
            failed: counts.failed,
            cancelled: counts.cancelled,
            last_job: last_job.map(|job| JobEntry::from_job(&job, now_epoch_ms)),
            pipeline_id,
        });
    }

    Ok(SystemStatus {
        pipelines,
        subscriber_count,
        retry_metrics: retry_metrics(pending_retry_attempts, effective_max_attempts),
        timestamp: now_epoch_ms,
    })
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
