//! Liveness and readiness probes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::state::AppState;

/// Probe response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProbeResponse {
    /// `ok`, `ready` or `degraded`.
    pub status: String,
    /// Service version.
    pub version: String,
    /// Database status, reported by the readiness probe only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    /// Live memoization entries, reported by the readiness probe only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_results: Option<usize>,
}

/// Liveness probe: the process is up and serving.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is alive", body = ProbeResponse)
    )
)]
pub async fn liveness() -> Json<ProbeResponse> {
    Json(ProbeResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: None,
        cached_results: None,
    })
}

/// Readiness probe: the database answers a round trip.
///
/// Degraded deployments answer 503 so orchestrators stop routing to
/// them; the audit pipeline keeps absorbing records either way.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses(
        (status = 200, description = "Service is ready", body = ProbeResponse),
        (status = 503, description = "Database unreachable", body = ProbeResponse)
    )
)]
pub async fn readiness(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ProbeResponse>) {
    let version = env!("CARGO_PKG_VERSION").to_string();
    let cached_results = Some(state.cache.len());

    match sqlx::query("SELECT 1").fetch_one(&state.pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(ProbeResponse {
                status: "ready".to_string(),
                version,
                database: Some("connected".to_string()),
                cached_results,
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ProbeResponse {
                status: "degraded".to_string(),
                version,
                database: Some(format!("error: {}", e)),
                cached_results,
            }),
        ),
    }
}
