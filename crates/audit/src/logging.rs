//! Log persistence as an injected sink.
//!
//! Rather than hooking persistence into the global logger, the sink is
//! an explicit component handed to whatever emits log lines. Emission
//! forwards to `tracing` and queues a
//! [`LogRecord`] for background persistence, so a slow or failing store
//! never blocks the emitter and can never recurse through the logging
//! subsystem itself.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Severity of an emitted line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        }
    }

    /// Only INFO and above are persisted.
    fn persisted(&self) -> bool {
        !matches!(self, LogLevel::Debug)
    }
}

/// One persisted log line. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// Assigned by storage; 0 until stored.
    pub id: i64,
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Durable storage backend for log records.
#[async_trait::async_trait]
pub trait LogStorage: Send + Sync {
    async fn store(&self, record: &LogRecord) -> Result<i64>;

    /// The most recent records, newest first.
    async fn recent(&self, limit: u32) -> Result<Vec<LogRecord>>;
}

/// In-memory log storage for testing.
pub struct MemoryLogStorage {
    records: Arc<tokio::sync::RwLock<Vec<LogRecord>>>,
    next_id: Arc<std::sync::atomic::AtomicI64>,
}

impl MemoryLogStorage {
    pub fn new() -> Self {
        Self {
            records: Arc::new(tokio::sync::RwLock::new(Vec::new())),
            next_id: Arc::new(std::sync::atomic::AtomicI64::new(1)),
        }
    }
}

impl Default for MemoryLogStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LogStorage for MemoryLogStorage {
    async fn store(&self, record: &LogRecord) -> Result<i64> {
        let id = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let mut stored = record.clone();
        stored.id = id;

        let mut records = self.records.write().await;
        records.push(stored);

        Ok(id)
    }

    async fn recent(&self, limit: u32) -> Result<Vec<LogRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

/// Injected log sink: forwards to `tracing`, persists INFO and above.
pub struct LogSink {
    storage: Arc<dyn LogStorage>,
    tx: mpsc::Sender<LogRecord>,
}

impl LogSink {
    /// Spawn the persistence worker. Storage failures are logged through
    /// plain `tracing` (never back through the sink) and discarded.
    pub fn new(storage: Arc<dyn LogStorage>) -> Self {
        let (tx, mut rx) = mpsc::channel::<LogRecord>(10000);

        let storage_clone = storage.clone();
        tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                if let Err(e) = storage_clone.store(&record).await {
                    tracing::error!(error = %e, "Failed to persist log record");
                }
            }
        });

        Self { storage, tx }
    }

    /// Emit a log line at the given level.
    pub fn emit(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();

        match level {
            LogLevel::Debug => tracing::debug!("{message}"),
            LogLevel::Info => tracing::info!("{message}"),
            LogLevel::Warning => tracing::warn!("{message}"),
            LogLevel::Error => tracing::error!("{message}"),
        }

        if !level.persisted() {
            return;
        }

        let record = LogRecord {
            id: 0,
            level,
            message,
            timestamp: Utc::now(),
        };
        if self.tx.try_send(record).is_err() {
            tracing::warn!("Log channel full, record dropped");
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(LogLevel::Info, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.emit(LogLevel::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(LogLevel::Error, message);
    }

    /// The most recent records, newest first.
    pub async fn recent(&self, limit: u32) -> Result<Vec<LogRecord>> {
        self.storage.recent(limit).await
    }
}
