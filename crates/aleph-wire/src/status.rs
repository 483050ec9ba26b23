// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status Aggregator output shapes, consumed by `GET /api/status`,
//! `GET /api/scans/recent`, and `GET /api/scans/stats`.

use aleph_core::{Job, JobError, JobId, JobStatus};
use serde::{Deserialize, Serialize};

/// One row of the job listing surface (`GET /api/pipelines/:id/jobs`,
/// `GET /api/scans/recent`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobEntry {
    pub id: String,
    pub pipeline_id: String,
    pub status: JobStatus,
    pub created_at: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
    pub attempt: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
}

impl JobEntry {
    pub fn from_job(job: &Job, now_epoch_ms: u64) -> Self {
        Self {
            id: job.id.as_str().to_string(),
            pipeline_id: job.pipeline_id.clone(),
            status: job.status,
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
            elapsed_ms: job.elapsed_ms(now_epoch_ms),
            attempt: job.attempt,
            error: job.error.clone(),
        }
    }
}

impl From<&JobId> for JobEntry {
    fn from(id: &JobId) -> Self {
        Self {
            id: id.as_str().to_string(),
            pipeline_id: id.pipeline_id().to_string(),
            status: JobStatus::Queued,
            created_at: 0,
            started_at: None,
            completed_at: None,
            elapsed_ms: None,
            attempt: 0,
            error: None,
        }
    }
}

/// Derived health for a single pipeline (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineHealth {
    Running,
    Idle,
    Failing,
}

aleph_core::simple_display! {
    PipelineHealth {
        Running => "running",
        Idle => "idle",
        Failing => "failing",
    }
}

/// Per-pipeline rollup inside [`SystemStatus`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PipelineStatusEntry {
    pub pipeline_id: String,
    pub human_name: String,
    pub status: PipelineHealth,
    pub queued: u64,
    pub running: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_job: Option<JobEntry>,
}

/// Global retry metrics bucketed by attempt, over currently-scheduled
/// retries only (not historical attempts already resolved).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryMetrics {
    pub attempt_1: u64,
    pub attempt_2: u64,
    pub attempt_3_plus: u64,
    /// `attempt >= MAX_ATTEMPTS - 1`, i.e. one retry away from exhausting
    /// the pipeline's effective attempt budget.
    pub nearing_limit: u64,
}

/// Full body of `GET /api/status`. Derived on demand from
/// `Registry::ids() ∪ Store::distinctPipelineIds()` — never hard-codes a
/// single pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemStatus {
    pub pipelines: Vec<PipelineStatusEntry>,
    pub subscriber_count: u32,
    pub retry_metrics: RetryMetrics,
    pub timestamp: u64,
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
