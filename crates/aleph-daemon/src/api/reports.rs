// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `/api/reports/*` — flat-file report artifacts (§6). Filenames are
//! validated against path traversal before ever reaching the filesystem.

use aleph_wire::{ReportEntry, ReportListing};
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use super::{ApiError, AppState};

fn reject_traversal(filename: &str) -> Result<(), ApiError> {
    if filename.is_empty() || filename.contains('/') || filename.contains('\\') || filename.contains("..") {
        return Err(ApiError::validation(format!("invalid report filename: {filename}")));
    }
    Ok(())
}

fn content_type_for(filename: &str) -> &'static str {
    match filename.rsplit('.').next() {
        Some("html") => "text/html; charset=utf-8",
        Some("md") => "text/markdown; charset=utf-8",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Deserialize)]
pub struct ListReportsQuery {
    pub limit: Option<u32>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(rename = "type")]
    #[serde(default)]
    pub report_type: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListReportsQuery>,
) -> Result<Json<ReportListing>, ApiError> {
    let limit = query.limit.unwrap_or(20) as usize;
    let mut entries = std::fs::read_dir(&state.reports_dir)
        .map(|dir| {
            dir.filter_map(Result::ok)
                .filter_map(|entry| {
                    let filename = entry.file_name().to_string_lossy().into_owned();
                    if let Some(ref format) = query.format {
                        if !filename.ends_with(&format!(".{format}")) {
                            return None;
                        }
                    }
                    if let Some(ref report_type) = query.report_type {
                        if !filename.contains(report_type.as_str()) {
                            return None;
                        }
                    }
                    let meta = entry.metadata().ok()?;
                    let modified_at = meta
                        .modified()
                        .ok()
                        .and_then(|m| m.duration_since(std::time::UNIX_EPOCH).ok())
                        .map(|d| d.as_millis() as u64)
                        .unwrap_or(0);
                    Some(ReportEntry { filename, size_bytes: meta.len(), modified_at })
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    entries.sort_by(|a, b| b.modified_at.cmp(&a.modified_at));
    entries.truncate(limit);
    Ok(Json(ReportListing { reports: entries }))
}

pub async fn get(State(state): State<AppState>, Path(filename): Path<String>) -> Result<impl IntoResponse, ApiError> {
    reject_traversal(&filename)?;
    let path = state.reports_dir.join(&filename);
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| ApiError::not_found(format!("report {filename} not found")))?;

    let mut headers = HeaderMap::new();
    let content_type = content_type_for(&filename)
        .parse()
        .unwrap_or_else(|_| header::HeaderValue::from_static("application/octet-stream"));
    headers.insert(header::CONTENT_TYPE, content_type);
    Ok((headers, Bytes::from(bytes)))
}

pub async fn delete_report(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<StatusCode, ApiError> {
    reject_traversal(&filename)?;
    let path = state.reports_dir.join(&filename);
    tokio::fs::remove_file(&path).await.map_err(|_| ApiError::not_found(format!("report {filename} not found")))?;
    Ok(StatusCode::OK)
}

#[cfg(test)]
#[path = "reports_tests.rs"]
mod tests;
