// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read/Mutation API (§4.8): the `axum` router, shared application state,
//! and the error-to-status-code mapping every handler funnels through.

mod health;
mod pipelines;
mod reports;
mod scans;
mod status;
mod ws;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{delete, get, post};
use axum::Router;
use serde::Serialize;

use aleph_core::{AlephError, SystemClock};
use aleph_engine::{PipelineRegistry, Scheduler};
use aleph_storage::SqliteJobStore;

use crate::broadcast::Broadcaster;
use crate::health::SecretCacheProbe;
use crate::ratelimit::RateLimiter;

/// Everything a handler needs, cheap to clone (every field is an `Arc` or
/// `Clone`-cheap value) since `axum::extract::State` clones it per request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SqliteJobStore>,
    pub registry: Arc<PipelineRegistry>,
    pub scheduler: Arc<Scheduler<SystemClock>>,
    pub broadcaster: Broadcaster,
    pub rate_limiter: Arc<RateLimiter>,
    pub clock: SystemClock,
    pub reports_dir: PathBuf,
    pub default_scan_pipeline: String,
    pub secret_cache: Arc<SecretCacheProbe>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/ws", get(ws::upgrade))
        .route("/api/status", get(status::system_status))
        .route("/api/scans/start", post(scans::start))
        .route("/api/scans/start-multi", post(scans::start_multi))
        .route("/api/scans/:scan_id/status", get(scans::scan_status))
        .route("/api/scans/:scan_id/results", get(scans::scan_results))
        .route("/api/scans/recent", get(scans::recent))
        .route("/api/scans/stats", get(scans::stats))
        .route("/api/scans/:job_id", delete(scans::cancel))
        .route("/api/pipelines/:id/jobs", get(pipelines::list_jobs))
        .route("/api/pipelines/:id/trigger", post(pipelines::trigger))
        .route("/api/reports", get(reports::list))
        .route("/api/reports/:filename", get(reports::get).delete(reports::delete_report))
        .with_state(state)
}

/// Consumes one token from the per-source bucket for a mutation endpoint,
/// rejecting with `429` when it's empty (§4.8). `addr` is `None` when a
/// handler is invoked without a socket behind it (direct unit tests); such
/// callers have no source IP to bucket on, so the request passes through.
pub(crate) fn enforce_rate_limit(state: &AppState, addr: Option<ConnectInfo<SocketAddr>>) -> Result<(), ApiError> {
    match addr {
        Some(ConnectInfo(addr)) if !state.rate_limiter.try_acquire(addr.ip()) => Err(ApiError::rate_limited()),
        _ => Ok(()),
    }
}

static CORRELATION_SEQ: AtomicU64 = AtomicU64::new(1);

fn correlation_id() -> String {
    format!("corr-{:x}", CORRELATION_SEQ.fetch_add(1, Ordering::Relaxed))
}

/// Every handler error funnels through this, so the kind/message/correlation
/// id triple in §7's propagation policy is produced exactly once.
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
    correlation_id: String,
}

#[derive(Serialize)]
struct ApiErrorBody<'a> {
    kind: &'a str,
    message: &'a str,
    correlation_id: &'a str,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "ValidationError", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NotFound", message)
    }

    pub fn rate_limited() -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, "RateLimited", "rate limit exceeded")
    }

    fn new(status: StatusCode, kind: &'static str, message: impl Into<String>) -> Self {
        Self { status, kind, message: message.into(), correlation_id: correlation_id() }
    }
}

impl From<AlephError> for ApiError {
    fn from(error: AlephError) -> Self {
        let status = StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self { status, kind: error.kind(), message: error.to_string(), correlation_id: correlation_id() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = ApiErrorBody { kind: self.kind, message: &self.message, correlation_id: &self.correlation_id };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
