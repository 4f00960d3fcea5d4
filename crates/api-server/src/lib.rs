//! API Server
//!
//! REST API for the math operations service.
//!
//! # Features
//!
//! - **Compute**: pow, fibonacci and factorial with TTL memoization
//! - **Authentication**: signed tokens over a bearer or cookie transport
//! - **Audit**: asynchronous persistence of every computation
//! - **OpenAPI**: Auto-generated Swagger documentation
//!
//! # Example
//!
//! ```ignore
//! use api_server::{ApiServer, ServerConfig};
//!
//! let config = ServerConfig::from_env();
//! let server = ApiServer::new(config, pool)?;
//! server.run().await?;
//! ```

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod seed;
pub mod state;
pub mod transport;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use seed::{seed_admin, seed_admin_from_env};
pub use state::AppState;
pub use transport::TokenTransport;

use axum::extract::DefaultBodyLimit;
use axum::http::Request;
use sqlx::PgPool;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::{info, Level};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Enable CORS for all origins (development only).
    pub cors_permissive: bool,
    /// Secret for token signing.
    pub jwt_secret: String,
    /// Token lifetime in minutes.
    pub token_ttl_minutes: i64,
    /// Memoization entry lifetime in seconds.
    pub cache_ttl_secs: u64,
    /// Active token transport for this deployment.
    pub transport: TokenTransport,
    /// Username that registration refuses (the seeded admin's name).
    pub reserved_username: String,
    /// Path of the secondary JSONL audit stream.
    pub audit_stream_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors_permissive: true,
            jwt_secret: "development-secret-change-in-production".to_string(),
            token_ttl_minutes: 30,
            cache_ttl_secs: 3600,
            transport: TokenTransport::Bearer,
            reserved_username: "admin".to_string(),
            audit_stream_path: PathBuf::from("audit_stream.jsonl"),
        }
    }
}

impl ServerConfig {
    /// Create from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            // Check PORT first (platform-provided), then API_PORT
            port: std::env::var("PORT")
                .or_else(|_| std::env::var("API_PORT"))
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            cors_permissive: std::env::var("CORS_PERMISSIVE")
                .map(|v| v == "true")
                .unwrap_or(defaults.cors_permissive),
            jwt_secret: std::env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            token_ttl_minutes: std::env::var("TOKEN_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.token_ttl_minutes),
            cache_ttl_secs: std::env::var("CACHE_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cache_ttl_secs),
            transport: TokenTransport::from_env(),
            // Registration refuses the admin's name wherever it comes from.
            reserved_username: std::env::var("ADMIN_USERNAME")
                .unwrap_or(defaults.reserved_username),
            audit_stream_path: std::env::var("AUDIT_STREAM_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.audit_stream_path),
        }
    }

    /// Get the socket address.
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

/// The API server.
pub struct ApiServer {
    config: ServerConfig,
    state: AppState,
}

impl ApiServer {
    /// Create a new API server with Postgres-backed stores.
    pub fn new(config: ServerConfig, pool: PgPool) -> anyhow::Result<Self> {
        let state = AppState::new(pool, &config)?;
        Ok(Self { config, state })
    }

    /// Run the server.
    pub async fn run(self) -> anyhow::Result<()> {
        let state = Arc::new(self.state);

        let router = create_router(state)
            .layer(
                TraceLayer::new_for_http()
                    .on_request(|request: &Request<_>, _span: &tracing::Span| {
                        tracing::info!(
                            method = %request.method(),
                            uri = %request.uri(),
                            "Incoming request"
                        );
                    })
                    .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
            )
            .layer(DefaultBodyLimit::max(64 * 1024)) // request bodies are tiny JSON
            .layer(if self.config.cors_permissive {
                CorsLayer::permissive()
            } else {
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any)
            });

        let addr = self.config.socket_addr()?;
        info!(address = %addr, "Starting API server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.token_ttl_minutes, 30);
        assert_eq!(config.cache_ttl_secs, 3600);
        assert_eq!(config.transport, TokenTransport::Bearer);
        assert_eq!(config.reserved_username, "admin");
    }

    #[test]
    fn test_socket_addr() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..ServerConfig::default()
        };
        assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:8080");
    }
}
