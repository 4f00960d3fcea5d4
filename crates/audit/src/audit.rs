//! Asynchronous audit persistence.
//!
//! Every successfully computed request produces one [`AuditRecord`].
//! Persistence runs after the response is decided: records are queued on
//! a channel and written by a background worker, so neither the durable
//! insert nor the secondary stream can delay or fail the request path.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

/// One completed computation request. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Assigned by storage; 0 until stored.
    pub id: i64,
    /// Operation name (`pow`, `fibonacci`, `factorial`).
    pub operation: String,
    /// First argument.
    pub param1: f64,
    /// Second argument, absent for single-argument operations.
    pub param2: Option<f64>,
    /// Result rendered as text (results may exceed any numeric type).
    pub result: String,
    /// Username of the caller.
    pub username: String,
    /// When the computation completed.
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(
        operation: impl Into<String>,
        param1: f64,
        param2: Option<f64>,
        result: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            operation: operation.into(),
            param1,
            param2,
            result: result.into(),
            username: username.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Durable storage backend for audit records.
#[async_trait::async_trait]
pub trait AuditStorage: Send + Sync {
    /// Store a record, returning its assigned id.
    async fn store(&self, record: &AuditRecord) -> Result<i64>;

    /// The most recent records, newest first.
    async fn recent(&self, limit: u32) -> Result<Vec<AuditRecord>>;
}

/// Best-effort secondary append-only mirror of audit records.
#[async_trait::async_trait]
pub trait StreamSink: Send + Sync {
    async fn append(&self, record: &AuditRecord) -> Result<()>;
}

/// In-memory audit storage for testing.
pub struct MemoryAuditStorage {
    records: Arc<tokio::sync::RwLock<Vec<AuditRecord>>>,
    next_id: Arc<std::sync::atomic::AtomicI64>,
}

impl MemoryAuditStorage {
    pub fn new() -> Self {
        Self {
            records: Arc::new(tokio::sync::RwLock::new(Vec::new())),
            next_id: Arc::new(std::sync::atomic::AtomicI64::new(1)),
        }
    }
}

impl Default for MemoryAuditStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl AuditStorage for MemoryAuditStorage {
    async fn store(&self, record: &AuditRecord) -> Result<i64> {
        let id = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let mut stored = record.clone();
        stored.id = id;

        let mut records = self.records.write().await;
        records.push(stored);

        Ok(id)
    }

    async fn recent(&self, limit: u32) -> Result<Vec<AuditRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

/// In-memory stream sink for testing.
#[derive(Default)]
pub struct MemoryStreamSink {
    pub lines: Arc<tokio::sync::RwLock<Vec<String>>>,
}

impl MemoryStreamSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl StreamSink for MemoryStreamSink {
    async fn append(&self, record: &AuditRecord) -> Result<()> {
        let line = serde_json::to_string(record)?;
        self.lines.write().await.push(line);
        Ok(())
    }
}

/// Stream sink appending one JSON line per record to a file.
pub struct JsonlStreamSink {
    path: std::path::PathBuf,
}

impl JsonlStreamSink {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl StreamSink for JsonlStreamSink {
    async fn append(&self, record: &AuditRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;

        Ok(())
    }
}

/// Audit pipeline: non-blocking enqueue, background persistence.
pub struct AuditPipeline {
    storage: Arc<dyn AuditStorage>,
    tx: mpsc::Sender<AuditRecord>,
}

impl AuditPipeline {
    /// Spawn the persistence worker.
    ///
    /// The worker first performs the durable insert, then mirrors the
    /// record to the stream sink. Each failure is caught and logged on
    /// its own: a storage failure does not stop the mirror, a mirror
    /// failure does not undo the insert, and neither is retried inline
    /// or surfaced to the request that produced the record.
    pub fn new(storage: Arc<dyn AuditStorage>, sink: Arc<dyn StreamSink>) -> Self {
        let (tx, mut rx) = mpsc::channel::<AuditRecord>(10000);

        let storage_clone = storage.clone();
        tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                if let Err(e) = storage_clone.store(&record).await {
                    tracing::error!(error = %e, operation = %record.operation, "Failed to store audit record");
                }
                if let Err(e) = sink.append(&record).await {
                    tracing::warn!(error = %e, operation = %record.operation, "Failed to mirror audit record to stream sink");
                }
            }
        });

        Self { storage, tx }
    }

    /// Enqueue a record (non-blocking, called after the response is built).
    pub fn record(&self, record: AuditRecord) {
        if self.tx.try_send(record).is_err() {
            tracing::warn!("Audit channel full, record dropped");
        }
    }

    /// The most recent records, newest first.
    pub async fn recent(&self, limit: u32) -> Result<Vec<AuditRecord>> {
        self.storage.recent(limit).await
    }
}
