//! Access guard middleware.
//!
//! `require_auth` resolves identity and role from the configured token
//! transport; `require_admin` layers a role check on top. Resolution
//! order is fixed: a missing or invalid token always yields 401 before
//! any role check runs.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use auth::Claims;

use crate::error::ApiError;
use crate::state::AppState;

/// Extract and validate the token from the active transport.
/// On success, injects `Claims` into request extensions for handlers.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = match state.transport.extract(request.headers()) {
        Some(t) => t,
        None => {
            return ApiError::Unauthenticated("Missing credentials".to_string()).into_response();
        }
    };

    let claims = match state.tokens.validate(&token) {
        Ok(c) => c,
        Err(e) => {
            tracing::debug!(error = %e, "Token validation failed");
            return ApiError::Unauthenticated("Invalid or expired token".to_string())
                .into_response();
        }
    };

    tracing::debug!(username = %claims.sub, role = ?claims.role, "Authenticated request");

    request.extensions_mut().insert(claims);

    next.run(request).await
}

/// Middleware that requires the admin role.
/// Must be applied AFTER `require_auth`.
pub async fn require_admin(
    State(_state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let claims = match request.extensions().get::<Claims>() {
        Some(c) => c,
        None => {
            // Unreachable when require_auth runs first.
            return ApiError::Unauthenticated("Not authenticated".to_string()).into_response();
        }
    };

    if !claims.role.can_administer() {
        return ApiError::Forbidden("Admin role required".to_string()).into_response();
    }

    next.run(request).await
}
