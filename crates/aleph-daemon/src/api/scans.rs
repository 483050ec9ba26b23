// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/api/scans/*` — the scan-oriented convenience surface over the job
//! control plane, implicitly targeting [`AppState::default_scan_pipeline`]
//! since none of these routes take an explicit pipeline id.

use std::net::SocketAddr;

use aleph_core::{AlephError, Clock, Job, JobId};
use aleph_wire::{JobEntry, ScanStartResponse};
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct StartScanRequest {
    pub repository_path: String,
    #[serde(default)]
    pub options: ScanOptions,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScanOptions {
    #[serde(default)]
    pub force_refresh: bool,
}

#[derive(Debug, Deserialize)]
pub struct StartMultiScanRequest {
    pub repository_paths: Vec<String>,
    #[serde(default)]
    pub group_name: Option<String>,
}

fn scan_urls(job_id: &JobId) -> (String, String) {
    (format!("/api/scans/{job_id}/status"), format!("/api/scans/{job_id}/results"))
}

pub async fn start(
    State(state): State<AppState>,
    addr: Option<ConnectInfo<SocketAddr>>,
    Json(request): Json<StartScanRequest>,
) -> Result<(StatusCode, Json<ScanStartResponse>), ApiError> {
    super::enforce_rate_limit(&state, addr)?;
    if request.repository_path.trim().is_empty() {
        return Err(ApiError::validation("repositoryPath must not be empty"));
    }

    let data = json!({
        "repository_path": request.repository_path,
        "force_refresh": request.options.force_refresh,
    });
    let job = Job::new(state.default_scan_pipeline.clone(), data, &state.clock);
    let job_id = job.id.clone();
    state.scheduler.enqueue(job).await?;

    let (status_url, results_url) = scan_urls(&job_id);
    Ok((StatusCode::CREATED, Json(ScanStartResponse { job_id: job_id.to_string(), status_url, results_url })))
}

pub async fn start_multi(
    State(state): State<AppState>,
    addr: Option<ConnectInfo<SocketAddr>>,
    Json(request): Json<StartMultiScanRequest>,
) -> Result<(StatusCode, Json<ScanStartResponse>), ApiError> {
    super::enforce_rate_limit(&state, addr)?;
    if request.repository_paths.len() < 2 {
        return Err(ApiError::validation("repositoryPaths must contain at least 2 entries"));
    }

    let data = json!({
        "repository_paths": request.repository_paths,
        "group_name": request.group_name,
        "scan_type": "single-project",
    });
    let job = Job::new(state.default_scan_pipeline.clone(), data, &state.clock);
    let job_id = job.id.clone();
    state.scheduler.enqueue(job).await?;

    let (status_url, results_url) = scan_urls(&job_id);
    Ok((StatusCode::CREATED, Json(ScanStartResponse { job_id: job_id.to_string(), status_url, results_url })))
}

async fn load_job(state: &AppState, scan_id: &str) -> Result<Job, ApiError> {
    state
        .store
        .get(&JobId::from_string(scan_id))
        .await
        .map_err(AlephError::from)?
        .ok_or_else(|| ApiError::not_found(format!("scan {scan_id} not found")))
}

pub async fn scan_status(
    State(state): State<AppState>,
    Path(scan_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let job = load_job(&state, &scan_id).await?;
    let entry = JobEntry::from_job(&job, state.clock.epoch_ms());
    Ok(Json(json!({
        "scan_id": job.id.to_string(),
        "status": entry.status,
        "attempt": entry.attempt,
        "created_at": entry.created_at,
        "started_at": entry.started_at,
        "completed_at": entry.completed_at,
        "elapsed_ms": entry.elapsed_ms,
        "error": entry.error,
    })))
}

#[derive(Debug, Deserialize)]
pub struct ResultsQuery {
    #[serde(default)]
    pub format: ResultsFormat,
}

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResultsFormat {
    #[default]
    Summary,
    Full,
}

/// Keeps only scalar top-level fields for `format=summary`; arrays and
/// nested objects are the detail a `full` request pays for.
fn summarize(result: &serde_json::Value) -> serde_json::Value {
    match result.as_object() {
        Some(map) => {
            let summary: serde_json::Map<String, serde_json::Value> = map
                .iter()
                .filter(|(_, v)| !v.is_array() && !v.is_object())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            serde_json::Value::Object(summary)
        }
        None => result.clone(),
    }
}

pub async fn scan_results(
    State(state): State<AppState>,
    Path(scan_id): Path<String>,
    Query(query): Query<ResultsQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let job = load_job(&state, &scan_id).await?;
    let result = job.result.unwrap_or(serde_json::Value::Null);
    let body = match query.format {
        ResultsFormat::Summary => json!({ "summary": summarize(&result) }),
        ResultsFormat::Full => json!({ "results": result }),
    };
    Ok(Json(body))
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<u32>,
}

pub async fn recent(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let limit = query.limit.unwrap_or(20).min(100);
    let jobs = state
        .store
        .list_by_pipeline(&state.default_scan_pipeline, limit)
        .await
        .map_err(AlephError::from)?;
    let now = state.clock.epoch_ms();
    let scans: Vec<JobEntry> = jobs.iter().map(|j| JobEntry::from_job(j, now)).collect();
    let count = scans.len();
    Ok(Json(json!({ "scans": scans, "count": count })))
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let counts = state.store.counts(&state.default_scan_pipeline).await.map_err(AlephError::from)?;
    let recent = state
        .store
        .list_by_pipeline(&state.default_scan_pipeline, 200)
        .await
        .map_err(AlephError::from)?;
    let now = state.clock.epoch_ms();
    let durations: Vec<u64> = recent.iter().filter_map(|j| j.elapsed_ms(now)).collect();
    let average_ms = if durations.is_empty() { 0 } else { durations.iter().sum::<u64>() / durations.len() as u64 };

    Ok(Json(json!({
        "totals": {
            "queued": counts.queued,
            "running": counts.running,
            "completed": counts.completed,
            "failed": counts.failed,
            "cancelled": counts.cancelled,
        },
        "averages": { "duration_ms": average_ms },
    })))
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub success: bool,
    pub message: String,
}

pub async fn cancel(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<CancelResponse>, ApiError> {
    state.scheduler.cancel(&JobId::from_string(&job_id)).await?;
    Ok(Json(CancelResponse { success: true, message: format!("job {job_id} cancellation requested") }))
}

#[cfg(test)]
#[path = "scans_tests.rs"]
mod tests;
