//! Authentication handlers: registration, login, logout, identity.

use axum::extract::{FromRequest, Request, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Form, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use auth::Claims;

use crate::error::{ApiError, ApiJson, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// User registration request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

/// User login request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Plain confirmation message.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Bearer-transport login response.
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

/// Current identity, resolved from the token.
#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub username: String,
    pub role: String,
}

/// Extractor accepting JSON or form-encoded bodies.
///
/// Login must serve OAuth2-style form clients next to JSON clients.
pub struct JsonOrForm<T>(pub T);

impl<S, T> FromRequest<S> for JsonOrForm<T>
where
    S: Send + Sync,
    T: serde::de::DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_json = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("application/json"))
            .unwrap_or(false);

        if is_json {
            let Json(value) = Json::<T>::from_request(req, state).await?;
            Ok(Self(value))
        } else {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|e| ApiError::JsonRejection(e.body_text()))?;
            Ok(Self(value))
        }
    }
}

/// Register a new user account with role `user`.
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User registered", body = MessageResponse),
        (status = 400, description = "Duplicate or reserved username", body = crate::error::ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<Json<MessageResponse>> {
    state
        .credentials
        .register(&req.username, &req.password)
        .await?;

    state.logs.info(format!("User registered: {}", req.username));

    Ok(Json(MessageResponse {
        message: "User registered successfully".to_string(),
    }))
}

/// Login with username and password.
///
/// The success body depends on the active transport: bearer deployments
/// receive the token, cookie deployments receive a Set-Cookie header.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    JsonOrForm(req): JsonOrForm<LoginRequest>,
) -> ApiResult<Response> {
    let user = match state.credentials.login(&req.username, &req.password).await {
        Ok(user) => user,
        Err(e) => {
            metrics::record_login(false);
            state
                .logs
                .warning(format!("Failed login attempt for {}", req.username));
            return Err(e.into());
        }
    };

    metrics::record_login(true);
    state.logs.info(format!("User logged in: {}", user.username));

    let token = state
        .tokens
        .issue(&user.username, user.role)
        .map_err(|e| ApiError::Internal(format!("Token generation failed: {}", e)))?;

    let response = if let Some(cookie) = state.transport.login_cookie(&token) {
        let mut response = Json(MessageResponse {
            message: "Login successful".to_string(),
        })
        .into_response();
        let value = HeaderValue::from_str(&cookie.to_string())
            .map_err(|e| ApiError::Internal(format!("Cookie encoding failed: {}", e)))?;
        response.headers_mut().append(header::SET_COOKIE, value);
        response
    } else {
        Json(TokenResponse {
            access_token: token,
            token_type: "bearer".to_string(),
        })
        .into_response()
    };

    Ok(response)
}

/// Clear the client-held credential.
///
/// Stateless tokens have no server-side revocation: the token stays
/// valid until its natural expiry (deliberate limitation).
#[utoipa::path(
    post,
    path = "/logout",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Unauthenticated", body = crate::error::ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn logout(State(state): State<Arc<AppState>>) -> ApiResult<Response> {
    let mut response = Json(MessageResponse {
        message: "Logged out".to_string(),
    })
    .into_response();

    if let Some(cookie) = state.transport.removal_cookie() {
        let value = HeaderValue::from_str(&cookie.to_string())
            .map_err(|e| ApiError::Internal(format!("Cookie encoding failed: {}", e)))?;
        response.headers_mut().append(header::SET_COOKIE, value);
    }

    Ok(response)
}

/// Get the current authenticated identity.
#[utoipa::path(
    get,
    path = "/me",
    responses(
        (status = 200, description = "Current identity", body = MeResponse),
        (status = 401, description = "Unauthenticated", body = crate::error::ErrorResponse),
    ),
    tag = "auth"
)]
pub async fn me(Extension(claims): Extension<Claims>) -> Json<MeResponse> {
    Json(MeResponse {
        username: claims.sub,
        role: claims.role.as_str().to_string(),
    })
}
