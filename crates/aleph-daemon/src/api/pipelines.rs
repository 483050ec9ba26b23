// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/api/pipelines/:id/*` — direct per-pipeline job listing and triggering.

use std::net::SocketAddr;

use aleph_core::{AlephError, Clock, Job, JobStatus};
use aleph_wire::{JobEntry, TriggerRequest, TriggerResponse};
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    pub status: Option<JobStatus>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    /// Accepted for wire compatibility; no dashboard-tab-specific filtering
    /// is implemented server-side.
    #[serde(default)]
    pub tab: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct JobListing {
    pub jobs: Vec<JobEntry>,
    pub total: usize,
    pub has_more: bool,
}

pub async fn list_jobs(
    State(state): State<AppState>,
    Path(pipeline_id): Path<String>,
    Query(query): Query<ListJobsQuery>,
) -> Result<Json<JobListing>, ApiError> {
    // Job history for a pipeline id outlives its registration, matching the
    // registry's own "ids no longer registered still render" contract — so
    // this listing is never gated on `registry.resolve`.
    let limit = query.limit.unwrap_or(20).min(100);
    let offset = query.offset.unwrap_or(0);

    let fetched = state.store.list_by_pipeline(&pipeline_id, limit + offset + 1).await.map_err(AlephError::from)?;
    let now = state.clock.epoch_ms();
    let filtered: Vec<Job> = fetched
        .into_iter()
        .filter(|job| query.status.map_or(true, |s| s == job.status))
        .collect();

    let total = filtered.len();
    let page: Vec<JobEntry> =
        filtered.into_iter().skip(offset as usize).take(limit as usize).map(|j| JobEntry::from_job(&j, now)).collect();
    let has_more = (offset as usize + page.len()) < total;

    Ok(Json(JobListing { jobs: page, total, has_more }))
}

pub async fn trigger(
    State(state): State<AppState>,
    Path(pipeline_id): Path<String>,
    addr: Option<ConnectInfo<SocketAddr>>,
    Json(request): Json<TriggerRequest>,
) -> Result<(StatusCode, Json<TriggerResponse>), ApiError> {
    super::enforce_rate_limit(&state, addr)?;
    state.registry.resolve(&pipeline_id)?;
    let job = Job::new(pipeline_id.clone(), request.data, &state.clock);
    let job_id = job.id.to_string();
    state.scheduler.enqueue(job).await?;
    Ok((StatusCode::CREATED, Json(TriggerResponse { job_id, pipeline_id, status: "queued".to_string() })))
}

#[cfg(test)]
#[path = "pipelines_tests.rs"]
mod tests;
