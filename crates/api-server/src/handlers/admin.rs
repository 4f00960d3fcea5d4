//! Admin handlers: audit history, log history, metrics exposition.

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use audit::{AuditRecord, LogRecord};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// How far back the listing endpoints reach.
const RECENT_LIMIT: u32 = 100;

/// A persisted computation request.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuditRecordResponse {
    pub id: i64,
    pub operation: String,
    pub param1: f64,
    pub param2: Option<f64>,
    pub result: String,
    pub username: String,
    pub timestamp: DateTime<Utc>,
}

impl From<AuditRecord> for AuditRecordResponse {
    fn from(record: AuditRecord) -> Self {
        Self {
            id: record.id,
            operation: record.operation,
            param1: record.param1,
            param2: record.param2,
            result: record.result,
            username: record.username,
            timestamp: record.timestamp,
        }
    }
}

/// A persisted application log entry.
#[derive(Debug, Serialize, ToSchema)]
pub struct LogRecordResponse {
    pub id: i64,
    pub level: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl From<LogRecord> for LogRecordResponse {
    fn from(record: LogRecord) -> Self {
        Self {
            id: record.id,
            level: record.level.as_str().to_string(),
            message: record.message,
            timestamp: record.timestamp,
        }
    }
}

/// List the last 100 computation requests, newest first.
#[utoipa::path(
    get,
    path = "/admin/requests",
    responses(
        (status = 200, description = "Recent computation requests", body = [AuditRecordResponse]),
        (status = 401, description = "Unauthenticated", body = crate::error::ErrorResponse),
        (status = 403, description = "Admin role required", body = crate::error::ErrorResponse),
    ),
    tag = "admin"
)]
pub async fn list_requests(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<AuditRecordResponse>>> {
    let records = state
        .audit
        .recent(RECENT_LIMIT)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to load audit records: {}", e)))?;

    Ok(Json(records.into_iter().map(Into::into).collect()))
}

/// List the last 100 persisted log entries, newest first.
#[utoipa::path(
    get,
    path = "/admin/logs",
    responses(
        (status = 200, description = "Recent log entries", body = [LogRecordResponse]),
        (status = 401, description = "Unauthenticated", body = crate::error::ErrorResponse),
        (status = 403, description = "Admin role required", body = crate::error::ErrorResponse),
    ),
    tag = "admin"
)]
pub async fn list_logs(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<Vec<LogRecordResponse>>> {
    let records = state
        .logs
        .recent(RECENT_LIMIT)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to load log entries: {}", e)))?;

    Ok(Json(records.into_iter().map(Into::into).collect()))
}

/// Prometheus text exposition of the request counters.
#[utoipa::path(
    get,
    path = "/admin/metrics",
    responses(
        (status = 200, description = "Prometheus exposition", body = String, content_type = "text/plain"),
        (status = 401, description = "Unauthenticated", body = crate::error::ErrorResponse),
        (status = 403, description = "Admin role required", body = crate::error::ErrorResponse),
    ),
    tag = "admin"
)]
pub async fn metrics_exposition(State(state): State<Arc<AppState>>) -> Response {
    (
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.metrics.render(),
    )
        .into_response()
}
