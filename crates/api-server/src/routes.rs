//! API route definitions.
//!
//! Three route groups: public (register, login, health), authenticated
//! (compute operations, logout, identity), and admin (audit history,
//! logs, metrics). The auth guard is the outermost layer on both
//! protected groups, so a missing token always yields 401 before the
//! admin role check can yield 403.

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers::{admin, auth, compute, health};
use crate::middleware::{require_admin, require_auth};
use crate::state::AppState;

/// OpenAPI documentation.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Math Operations API",
        version = "1.0.0",
        description = "Authenticated arithmetic service with memoization and audit history"
    ),
    paths(
        health::liveness,
        health::readiness,
        auth::register,
        auth::login,
        auth::logout,
        auth::me,
        compute::pow,
        compute::fibonacci,
        compute::factorial,
        admin::list_requests,
        admin::list_logs,
        admin::metrics_exposition,
    ),
    components(
        schemas(
            crate::error::ErrorResponse,
            health::ProbeResponse,
            auth::RegisterRequest,
            auth::LoginRequest,
            auth::MessageResponse,
            auth::TokenResponse,
            auth::MeResponse,
            compute::PowRequest,
            compute::FibonacciRequest,
            compute::FactorialRequest,
            compute::MathResponse,
            admin::AuditRecordResponse,
            admin::LogRecordResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Registration, login and identity"),
        (name = "compute", description = "Arithmetic operations"),
        (name = "admin", description = "Audit history and observability"),
    )
)]
pub struct ApiDoc;

/// Create the main router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    let authenticated = Router::new()
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
        .route("/pow", post(compute::pow))
        .route("/fibonacci", post(compute::fibonacci))
        .route("/factorial", post(compute::factorial))
        .layer(from_fn_with_state(state.clone(), require_auth));

    // Layers run outermost-last, so require_auth wraps require_admin.
    let admin_only = Router::new()
        .route("/admin/requests", get(admin::list_requests))
        .route("/admin/logs", get(admin::list_logs))
        .route("/admin/metrics", get(admin::metrics_exposition))
        .layer(from_fn_with_state(state.clone(), require_admin))
        .layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health::liveness))
        .route("/ready", get(health::readiness))
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .merge(authenticated)
        .merge(admin_only)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::auth::{MemoryUserStore, UserStore};
    use audit::{
        AuditPipeline, AuditStorage, LogSink, MemoryAuditStorage, MemoryLogStorage,
        MemoryStreamSink,
    };
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use sqlx::postgres::PgPoolOptions;
    use std::time::Duration;
    use tower::ServiceExt;

    use crate::seed::seed_admin;
    use crate::transport::TokenTransport;
    use crate::ServerConfig;

    struct TestApp {
        router: Router,
        audit_storage: Arc<MemoryAuditStorage>,
    }

    fn test_app(transport: TokenTransport) -> TestApp {
        let config = ServerConfig {
            jwt_secret: "test-secret-key".to_string(),
            transport,
            ..ServerConfig::default()
        };

        // Never connected; readiness is not exercised here.
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();

        let users: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new());
        let audit_storage = Arc::new(MemoryAuditStorage::new());
        let pipeline = Arc::new(AuditPipeline::new(
            audit_storage.clone(),
            Arc::new(MemoryStreamSink::new()),
        ));
        let logs = Arc::new(LogSink::new(Arc::new(MemoryLogStorage::new())));
        let metrics = crate::metrics::install_recorder().unwrap();

        let state =
            AppState::from_parts(pool, &config, users, pipeline, logs, metrics).into_arc();

        TestApp {
            router: create_router(state),
            audit_storage,
        }
    }

    async fn send(router: &Router, request: Request<Body>) -> Response {
        router.clone().oneshot(request).await.unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn post_json_bearer(uri: &str, body: Value, token: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_bearer(uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    }

    async fn register_and_login(router: &Router, username: &str, password: &str) -> String {
        let response = send(
            router,
            post_json("/register", json!({"username": username, "password": password})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(
            router,
            post_json("/login", json!({"username": username, "password": password})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["token_type"], "bearer");
        body["access_token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_register_login_pow_end_to_end() {
        let app = test_app(TokenTransport::Bearer);
        let token = register_and_login(&app.router, "alice", "wonder1and").await;

        let response = send(
            &app.router,
            post_json_bearer("/pow", json!({"base": 2.0, "exponent": 10.0}), &token),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["operation"], "pow");
        assert_eq!(body["result"], json!(1024.0));

        // The audit write is asynchronous; give the worker a beat.
        tokio::time::sleep(Duration::from_millis(100)).await;
        let records = app.audit_storage.recent(10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].operation, "pow");
        assert_eq!(records[0].username, "alice");
        assert_eq!(records[0].result, "1024.0");
    }

    #[tokio::test]
    async fn test_factorial_audit_record_fields() {
        let app = test_app(TokenTransport::Bearer);
        let token = register_and_login(&app.router, "bob", "builder99").await;

        let response = send(
            &app.router,
            post_json_bearer("/factorial", json!({"n": 5}), &token),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["result"], json!(120));

        tokio::time::sleep(Duration::from_millis(100)).await;
        let records = app.audit_storage.recent(10).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].operation, "factorial");
        assert_eq!(records[0].param1, 5.0);
        assert_eq!(records[0].param2, None);
        assert_eq!(records[0].result, "120");
        assert_eq!(records[0].username, "bob");
    }

    #[tokio::test]
    async fn test_compute_requires_authentication() {
        let app = test_app(TokenTransport::Bearer);

        let response = send(
            &app.router,
            post_json("/pow", json!({"base": 2.0, "exponent": 3.0})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = body_json(response).await;
        assert_eq!(body["code"], "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn test_garbage_token_is_rejected() {
        let app = test_app(TokenTransport::Bearer);

        let response = send(
            &app.router,
            post_json_bearer("/pow", json!({"base": 2.0, "exponent": 3.0}), "not-a-token"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_validation_rejects_out_of_range_without_audit() {
        let app = test_app(TokenTransport::Bearer);
        let token = register_and_login(&app.router, "carol", "p4ssword").await;

        let response = send(
            &app.router,
            post_json_bearer("/fibonacci", json!({"n": -1}), &token),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let response = send(
            &app.router,
            post_json_bearer("/fibonacci", json!({"n": 20001}), &token),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = send(
            &app.router,
            post_json_bearer("/factorial", json!({"n": 1551}), &token),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        // Rejected requests never reach the audit pipeline.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(app.audit_storage.recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pow_overflow_rejected_without_audit() {
        let app = test_app(TokenTransport::Bearer);
        let token = register_and_login(&app.router, "oscar", "p4ssword").await;

        // In range, but 10^400 exceeds f64.
        let response = send(
            &app.router,
            post_json_bearer("/pow", json!({"base": 10.0, "exponent": 400.0}), &token),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(app.audit_storage.recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_json_uses_error_taxonomy() {
        let app = test_app(TokenTransport::Bearer);
        let token = register_and_login(&app.router, "peggy", "p4ssword").await;

        let response = send(
            &app.router,
            Request::builder()
                .method("POST")
                .uri("/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "INVALID_JSON");

        let response = send(
            &app.router,
            Request::builder()
                .method("POST")
                .uri("/pow")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "INVALID_JSON");
    }

    #[tokio::test]
    async fn test_fibonacci_boundary_values() {
        let app = test_app(TokenTransport::Bearer);
        let token = register_and_login(&app.router, "dave", "p4ssword").await;

        let response = send(
            &app.router,
            post_json_bearer("/fibonacci", json!({"n": 0}), &token),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["result"], json!(0));

        let response = send(
            &app.router,
            post_json_bearer("/fibonacci", json!({"n": 10}), &token),
        )
        .await;
        assert_eq!(body_json(response).await["result"], json!(55));
    }

    #[tokio::test]
    async fn test_admin_endpoints_forbidden_for_user_role() {
        let app = test_app(TokenTransport::Bearer);
        let token = register_and_login(&app.router, "eve", "p4ssword").await;

        for uri in ["/admin/requests", "/admin/logs", "/admin/metrics"] {
            let response = send(&app.router, get_bearer(uri, &token)).await;
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_admin_endpoints_require_auth_before_role() {
        let app = test_app(TokenTransport::Bearer);

        let response = send(
            &app.router,
            Request::builder()
                .uri("/admin/requests")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        // 401, never 403, when no credential is presented at all.
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_can_list_requests_and_logs() {
        // The admin account is seeded into the store, never registered.
        let config = ServerConfig {
            jwt_secret: "test-secret-key".to_string(),
            ..ServerConfig::default()
        };
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        let users: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new());
        seed_admin(users.clone(), "admin", "sup3rsecret").await.unwrap();
        let audit_storage = Arc::new(MemoryAuditStorage::new());
        let pipeline = Arc::new(AuditPipeline::new(
            audit_storage,
            Arc::new(MemoryStreamSink::new()),
        ));
        let logs = Arc::new(LogSink::new(Arc::new(MemoryLogStorage::new())));
        let metrics = crate::metrics::install_recorder().unwrap();
        let router = create_router(
            AppState::from_parts(pool, &config, users, pipeline, logs, metrics).into_arc(),
        );

        let response = send(
            &router,
            post_json("/login", json!({"username": "admin", "password": "sup3rsecret"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let token = body_json(response).await["access_token"]
            .as_str()
            .unwrap()
            .to_string();

        let response = send(&router, get_bearer("/admin/requests", &token)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_json(response).await.as_array().unwrap().is_empty());

        let response = send(&router, get_bearer("/admin/logs", &token)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&router, get_bearer("/admin/metrics", &token)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(content_type.starts_with("text/plain"));
    }

    #[tokio::test]
    async fn test_reserved_username_cannot_register() {
        let app = test_app(TokenTransport::Bearer);

        for name in ["admin", "Admin", "ADMIN"] {
            let response = send(
                &app.router,
                post_json("/register", json!({"username": name, "password": "p4ssword"})),
            )
            .await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", name);
            let body = body_json(response).await;
            assert_eq!(body["code"], "RESERVED_NAME");
        }
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let app = test_app(TokenTransport::Bearer);

        let first = send(
            &app.router,
            post_json("/register", json!({"username": "grace", "password": "p4ssword"})),
        )
        .await;
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(
            body_json(first).await["message"],
            "User registered successfully"
        );

        let second = send(
            &app.router,
            post_json("/register", json!({"username": "grace", "password": "0therpass"})),
        )
        .await;
        assert_eq!(second.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(second).await["code"], "DUPLICATE_USER");
    }

    #[tokio::test]
    async fn test_login_wrong_password_unauthorized() {
        let app = test_app(TokenTransport::Bearer);
        register_and_login(&app.router, "heidi", "c0rrect").await;

        let response = send(
            &app.router,
            post_json("/login", json!({"username": "heidi", "password": "wr0ng"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["code"], "INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn test_login_accepts_form_body() {
        let app = test_app(TokenTransport::Bearer);
        register_and_login(&app.router, "ivan", "p4ssword").await;

        let response = send(
            &app.router,
            Request::builder()
                .method("POST")
                .uri("/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("username=ivan&password=p4ssword"))
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["access_token"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_me_returns_identity() {
        let app = test_app(TokenTransport::Bearer);
        let token = register_and_login(&app.router, "judy", "p4ssword").await;

        let response = send(&app.router, get_bearer("/me", &token)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["username"], "judy");
        assert_eq!(body["role"], "user");
    }

    #[tokio::test]
    async fn test_cookie_transport_login_and_access() {
        let app = test_app(TokenTransport::Cookie { secure: false });

        let response = send(
            &app.router,
            post_json("/register", json!({"username": "kim", "password": "p4ssword"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(
            &app.router,
            post_json("/login", json!({"username": "kim", "password": "p4ssword"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(set_cookie.starts_with("access_token="));
        assert!(set_cookie.contains("HttpOnly"));
        let token = set_cookie
            .split(';')
            .next()
            .unwrap()
            .trim_start_matches("access_token=")
            .to_string();
        let body = body_json(response).await;
        assert_eq!(body["message"], "Login successful");

        // Bearer headers are ignored under the cookie transport.
        let response = send(
            &app.router,
            post_json_bearer("/pow", json!({"base": 2.0, "exponent": 3.0}), &token),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = send(
            &app.router,
            Request::builder()
                .method("POST")
                .uri("/pow")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::COOKIE, format!("access_token={}", token))
                .body(Body::from(json!({"base": 2.0, "exponent": 3.0}).to_string()))
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["result"], json!(8.0));

        // Logout clears the cookie.
        let response = send(
            &app.router,
            Request::builder()
                .method("POST")
                .uri("/logout")
                .header(header::COOKIE, format!("access_token={}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let removal = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(removal.contains("Max-Age=0"));
    }

    #[test]
    fn test_openapi_spec() {
        let doc = ApiDoc::openapi();
        let json = doc.to_json().unwrap();
        assert!(json.contains("Math Operations API"));
        assert!(json.contains("/fibonacci"));
        assert!(json.contains("/admin/requests"));
    }
}
