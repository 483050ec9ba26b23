// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The event catalog published on the internal Event Bus and, after batching,
//! over the push channel.

use crate::id::JobId;
use crate::job::JobError;
use serde::{Deserialize, Serialize};

/// An event flowing through the Event Bus. Tagged by `type` so subscribers on
/// the wire can discriminate without a side channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "job:created")]
    JobCreated { job_id: JobId, pipeline_id: String },

    #[serde(rename = "job:started")]
    JobStarted { job_id: JobId, pipeline_id: String, attempt: u32 },

    #[serde(rename = "job:progress")]
    JobProgress { job_id: JobId, pipeline_id: String, message: String },

    #[serde(rename = "job:completed")]
    JobCompleted { job_id: JobId, pipeline_id: String },

    #[serde(rename = "job:failed")]
    JobFailed { job_id: JobId, pipeline_id: String, error: JobError },

    #[serde(rename = "job:cancelled")]
    JobCancelled { job_id: JobId, pipeline_id: String },

    #[serde(rename = "pipeline:status")]
    PipelineStatus { pipeline_id: String, queued: u32, running: u32 },

    #[serde(rename = "retry:scheduled")]
    RetryScheduled { job_id: JobId, pipeline_id: String, attempt: u32, delay_ms: u64 },

    #[serde(rename = "retry:exhausted")]
    RetryExhausted { job_id: JobId, pipeline_id: String, attempt: u32 },

    #[serde(other, skip_serializing)]
    Unknown,
}

impl Event {
    /// The contractual event name, e.g. `"job:failed"`.
    pub fn name(&self) -> &'static str {
        match self {
            Event::JobCreated { .. } => "job:created",
            Event::JobStarted { .. } => "job:started",
            Event::JobProgress { .. } => "job:progress",
            Event::JobCompleted { .. } => "job:completed",
            Event::JobFailed { .. } => "job:failed",
            Event::JobCancelled { .. } => "job:cancelled",
            Event::PipelineStatus { .. } => "pipeline:status",
            Event::RetryScheduled { .. } => "retry:scheduled",
            Event::RetryExhausted { .. } => "retry:exhausted",
            Event::Unknown => "unknown",
        }
    }

    /// The job this event pertains to, if any (`pipeline:status` has none).
    pub fn job_id(&self) -> Option<&JobId> {
        match self {
            Event::JobCreated { job_id, .. }
            | Event::JobStarted { job_id, .. }
            | Event::JobProgress { job_id, .. }
            | Event::JobCompleted { job_id, .. }
            | Event::JobFailed { job_id, .. }
            | Event::JobCancelled { job_id, .. }
            | Event::RetryScheduled { job_id, .. }
            | Event::RetryExhausted { job_id, .. } => Some(job_id),
            Event::PipelineStatus { .. } | Event::Unknown => None,
        }
    }

    /// Whether this event must never be dropped by the Push Broadcaster's
    /// overflow policy (§4.7 / I6).
    pub fn is_critical(&self) -> bool {
        matches!(self, Event::JobFailed { .. } | Event::RetryExhausted { .. })
    }

    /// One-line human-readable summary for structured logging.
    pub fn log_summary(&self) -> String {
        match self {
            Event::JobCreated { job_id, pipeline_id } => {
                format!("job {job_id} created for pipeline {pipeline_id}")
            }
            Event::JobStarted { job_id, attempt, .. } => {
                format!("job {job_id} started (attempt {attempt})")
            }
            Event::JobProgress { job_id, message, .. } => {
                format!("job {job_id} progress: {message}")
            }
            Event::JobCompleted { job_id, .. } => format!("job {job_id} completed"),
            Event::JobFailed { job_id, error, .. } => {
                format!("job {job_id} failed: {} ({})", error.message, error.kind)
            }
            Event::JobCancelled { job_id, .. } => format!("job {job_id} cancelled"),
            Event::PipelineStatus { pipeline_id, queued, running } => {
                format!("pipeline {pipeline_id}: {queued} queued, {running} running")
            }
            Event::RetryScheduled { job_id, attempt, delay_ms, .. } => {
                format!("job {job_id} retry {attempt} scheduled in {delay_ms}ms")
            }
            Event::RetryExhausted { job_id, attempt, .. } => {
                format!("job {job_id} exhausted retries at attempt {attempt}")
            }
            Event::Unknown => "unknown event".to_string(),
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
