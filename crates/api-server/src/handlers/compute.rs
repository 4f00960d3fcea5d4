//! Computation handlers: pow, fibonacci, factorial.
//!
//! Every handler validates argument ranges, consults the memoization
//! cache, and enqueues an audit record. Auditing is fire-and-forget:
//! the response never waits on, or fails because of, persistence.

use axum::extract::State;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

use audit::AuditRecord;
use auth::Claims;
use compute::{ComputeCache, Operation};

use crate::error::{ApiError, ApiJson, ApiResult};
use crate::metrics;
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct PowRequest {
    pub base: f64,
    pub exponent: f64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FibonacciRequest {
    pub n: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FactorialRequest {
    pub n: i64,
}

/// Computation result, echoing the operation and its inputs.
#[derive(Debug, Serialize, ToSchema)]
pub struct MathResponse {
    pub operation: String,
    #[schema(value_type = Object)]
    pub input: Value,
    #[schema(value_type = Object)]
    pub result: Value,
}

/// Compute base^exponent.
#[utoipa::path(
    post,
    path = "/pow",
    request_body = PowRequest,
    responses(
        (status = 200, description = "Computation result", body = MathResponse),
        (status = 401, description = "Unauthenticated", body = crate::error::ErrorResponse),
        (status = 422, description = "Arguments out of range", body = crate::error::ErrorResponse),
    ),
    tag = "compute"
)]
pub async fn pow(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<PowRequest>,
) -> ApiResult<Json<MathResponse>> {
    // NaN fails both range checks, so it is rejected here too.
    if !(-1_000_000.0..=1_000_000.0).contains(&req.base) {
        return Err(ApiError::Validation(
            "base must be within [-1000000, 1000000]".to_string(),
        ));
    }
    if !(-1000.0..=1000.0).contains(&req.exponent) {
        return Err(ApiError::Validation(
            "exponent must be within [-1000, 1000]".to_string(),
        ));
    }

    metrics::record_request("pow");

    // powf is cheap; evaluate before caching so an overflowing result
    // is rejected instead of memoized as JSON null.
    let value = compute::pow(req.base, req.exponent);
    if !value.is_finite() {
        return Err(ApiError::Validation(
            "result exceeds the representable numeric range".to_string(),
        ));
    }

    let key = ComputeCache::key("pow", &[req.base.to_string(), req.exponent.to_string()]);
    let (result, hit) = state.cache.get_or_compute(key, || json!(value));
    metrics::record_cache("pow", hit);

    respond(
        &state,
        &claims,
        Operation::Pow,
        json!({ "base": req.base, "exponent": req.exponent }),
        req.base,
        Some(req.exponent),
        result,
    )
}

/// Compute the n-th Fibonacci number (fib(0) = 0).
#[utoipa::path(
    post,
    path = "/fibonacci",
    request_body = FibonacciRequest,
    responses(
        (status = 200, description = "Computation result", body = MathResponse),
        (status = 401, description = "Unauthenticated", body = crate::error::ErrorResponse),
        (status = 422, description = "Arguments out of range", body = crate::error::ErrorResponse),
    ),
    tag = "compute"
)]
pub async fn fibonacci(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<FibonacciRequest>,
) -> ApiResult<Json<MathResponse>> {
    if !(0..=20_000).contains(&req.n) {
        return Err(ApiError::Validation(
            "n must be within [0, 20000]".to_string(),
        ));
    }

    metrics::record_request("fibonacci");

    let n = req.n as u32;
    let key = ComputeCache::key("fibonacci", &[n.to_string()]);
    let (result, hit) = state
        .cache
        .get_or_compute(key, || compute::integer_value(&compute::fibonacci(n)));
    metrics::record_cache("fibonacci", hit);

    respond(
        &state,
        &claims,
        Operation::Fibonacci,
        json!({ "n": req.n }),
        req.n as f64,
        None,
        result,
    )
}

/// Compute n!.
#[utoipa::path(
    post,
    path = "/factorial",
    request_body = FactorialRequest,
    responses(
        (status = 200, description = "Computation result", body = MathResponse),
        (status = 401, description = "Unauthenticated", body = crate::error::ErrorResponse),
        (status = 422, description = "Arguments out of range", body = crate::error::ErrorResponse),
    ),
    tag = "compute"
)]
pub async fn factorial(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<FactorialRequest>,
) -> ApiResult<Json<MathResponse>> {
    if !(0..=1550).contains(&req.n) {
        return Err(ApiError::Validation(
            "n must be within [0, 1550]".to_string(),
        ));
    }

    metrics::record_request("factorial");

    let n = req.n as u32;
    let key = ComputeCache::key("factorial", &[n.to_string()]);
    let (result, hit) = state
        .cache
        .get_or_compute(key, || compute::integer_value(&compute::factorial(n)));
    metrics::record_cache("factorial", hit);

    respond(
        &state,
        &claims,
        Operation::Factorial,
        json!({ "n": req.n }),
        req.n as f64,
        None,
        result,
    )
}

/// Enqueue the audit record and build the response. Cache hits are
/// audited the same as fresh computations.
fn respond(
    state: &AppState,
    claims: &Claims,
    operation: Operation,
    input: Value,
    param1: f64,
    param2: Option<f64>,
    result: Value,
) -> ApiResult<Json<MathResponse>> {
    state.audit.record(AuditRecord::new(
        operation.as_str(),
        param1,
        param2,
        result_text(&result),
        &claims.sub,
    ));
    state.logs.info(format!(
        "{} computed for {}",
        operation.as_str(),
        claims.sub
    ));

    Ok(Json(MathResponse {
        operation: operation.as_str().to_string(),
        input,
        result,
    }))
}

/// Audit rows store the result as text; numbers render without quotes.
fn result_text(value: &Value) -> String {
    match value {
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
