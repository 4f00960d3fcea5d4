//! PostgreSQL storage backend for log records.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::logging::{LogLevel, LogRecord, LogStorage};

/// PostgreSQL-backed log storage.
pub struct PostgresLogStorage {
    pool: PgPool,
}

impl PostgresLogStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LogRow {
    id: i64,
    level: String,
    message: String,
    timestamp: DateTime<Utc>,
}

impl LogRow {
    fn into_record(self) -> LogRecord {
        LogRecord {
            id: self.id,
            level: parse_level(&self.level),
            message: self.message,
            timestamp: self.timestamp,
        }
    }
}

fn parse_level(level: &str) -> LogLevel {
    match level {
        "DEBUG" => LogLevel::Debug,
        "WARNING" => LogLevel::Warning,
        "ERROR" => LogLevel::Error,
        _ => LogLevel::Info,
    }
}

#[async_trait::async_trait]
impl LogStorage for PostgresLogStorage {
    async fn store(&self, record: &LogRecord) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO log_entries (level, message, "timestamp")
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(record.level.as_str())
        .bind(&record.message)
        .bind(record.timestamp)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(row.0)
    }

    async fn recent(&self, limit: u32) -> Result<Vec<LogRecord>> {
        let rows: Vec<LogRow> = sqlx::query_as(
            r#"
            SELECT id, level, message, "timestamp"
            FROM log_entries
            ORDER BY "timestamp" DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(LogRow::into_record).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("ERROR"), LogLevel::Error);
        assert_eq!(parse_level("WARNING"), LogLevel::Warning);
        assert_eq!(parse_level("INFO"), LogLevel::Info);
        // Unknown labels degrade to INFO.
        assert_eq!(parse_level("TRACE"), LogLevel::Info);
    }
}
