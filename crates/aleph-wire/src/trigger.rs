// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request/response DTOs for the job-creation endpoints
//! (`POST /api/scans/start`, `POST /api/scans/start-multi`,
//! `POST /api/pipelines/:id/trigger`).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct TriggerRequest {
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TriggerResponse {
    pub job_id: String,
    pub pipeline_id: String,
    pub status: String,
}

/// Response for `POST /api/scans/start` and `/api/scans/start-multi`, which
/// hand back navigable URLs rather than echoing the pipeline id.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScanStartResponse {
    pub job_id: String,
    pub status_url: String,
    pub results_url: String,
}

#[cfg(test)]
#[path = "trigger_tests.rs"]
mod tests;
