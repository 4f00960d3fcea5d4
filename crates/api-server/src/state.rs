//! Application state shared across handlers.

use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

use audit::{
    AuditPipeline, JsonlStreamSink, LogSink, PostgresAuditStorage, PostgresLogStorage, StreamSink,
};
use auth::{CredentialService, PostgresUserStore, TokenConfig, TokenService, UserStore};
use compute::ComputeCache;

use crate::transport::TokenTransport;
use crate::ServerConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: PgPool,
    /// Token issuance and validation.
    pub tokens: Arc<TokenService>,
    /// Registration and login over the credential store.
    pub credentials: Arc<CredentialService>,
    /// Memoization layer for computation results.
    pub cache: Arc<ComputeCache>,
    /// Asynchronous audit persistence.
    pub audit: Arc<AuditPipeline>,
    /// Injected log sink (persists INFO and above).
    pub logs: Arc<LogSink>,
    /// Active token transport for this deployment.
    pub transport: TokenTransport,
    /// Prometheus exposition handle.
    pub metrics: PrometheusHandle,
}

impl AppState {
    /// Create state with Postgres-backed stores.
    pub fn new(pool: PgPool, config: &ServerConfig) -> anyhow::Result<Self> {
        let users: Arc<dyn UserStore> = Arc::new(PostgresUserStore::new(pool.clone()));
        let audit_storage = Arc::new(PostgresAuditStorage::new(pool.clone()));
        let stream_sink: Arc<dyn StreamSink> =
            Arc::new(JsonlStreamSink::new(config.audit_stream_path.clone()));
        let log_storage = Arc::new(PostgresLogStorage::new(pool.clone()));

        let metrics = crate::metrics::install_recorder()?;

        Ok(Self::from_parts(
            pool,
            config,
            users,
            Arc::new(AuditPipeline::new(audit_storage, stream_sink)),
            Arc::new(LogSink::new(log_storage)),
            metrics,
        ))
    }

    /// Assemble state from already-built components.
    ///
    /// Production wiring goes through [`AppState::new`]; tests substitute
    /// in-memory stores here.
    pub fn from_parts(
        pool: PgPool,
        config: &ServerConfig,
        users: Arc<dyn UserStore>,
        audit: Arc<AuditPipeline>,
        logs: Arc<LogSink>,
        metrics: PrometheusHandle,
    ) -> Self {
        let tokens = Arc::new(TokenService::new(TokenConfig {
            secret: config.jwt_secret.clone(),
            ttl_minutes: config.token_ttl_minutes,
            issuer: None,
        }));
        let credentials = Arc::new(CredentialService::new(
            users,
            config.reserved_username.clone(),
        ));
        let cache = Arc::new(ComputeCache::new(Duration::from_secs(
            config.cache_ttl_secs,
        )));

        Self {
            pool,
            tokens,
            credentials,
            cache,
            audit,
            logs,
            transport: config.transport,
            metrics,
        }
    }

    /// Create an Arc-wrapped state.
    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}
