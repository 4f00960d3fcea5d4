//! Audit and Log Persistence
//!
//! Append-only audit records for completed computations and persisted
//! log lines, written asynchronously so the request path never waits on
//! durable storage or the secondary stream sink.

pub mod audit;
pub mod audit_storage_pg;
pub mod log_storage_pg;
pub mod logging;

pub use audit::{
    AuditPipeline, AuditRecord, AuditStorage, JsonlStreamSink, MemoryAuditStorage,
    MemoryStreamSink, StreamSink,
};
pub use audit_storage_pg::PostgresAuditStorage;
pub use log_storage_pg::PostgresLogStorage;
pub use logging::{LogLevel, LogRecord, LogSink, LogStorage, MemoryLogStorage};
