//! PostgreSQL storage backend for audit records.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::audit::{AuditRecord, AuditStorage};

/// PostgreSQL-backed audit storage.
///
/// Inserts run in a scoped transaction: commit on success, implicit
/// rollback when the transaction is dropped on error, and the pooled
/// connection is released on every exit path.
pub struct PostgresAuditStorage {
    pool: PgPool,
}

impl PostgresAuditStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row for audit records.
#[derive(Debug, sqlx::FromRow)]
struct AuditRow {
    id: i64,
    operation: String,
    param1: f64,
    param2: Option<f64>,
    result: String,
    username: String,
    timestamp: DateTime<Utc>,
}

impl AuditRow {
    fn into_record(self) -> AuditRecord {
        AuditRecord {
            id: self.id,
            operation: self.operation,
            param1: self.param1,
            param2: self.param2,
            result: self.result,
            username: self.username,
            timestamp: self.timestamp,
        }
    }
}

#[async_trait::async_trait]
impl AuditStorage for PostgresAuditStorage {
    async fn store(&self, record: &AuditRecord) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO math_requests (operation, param1, param2, result, username, "timestamp")
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&record.operation)
        .bind(record.param1)
        .bind(record.param2)
        .bind(&record.result)
        .bind(&record.username)
        .bind(record.timestamp)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(row.0)
    }

    async fn recent(&self, limit: u32) -> Result<Vec<AuditRecord>> {
        let rows: Vec<AuditRow> = sqlx::query_as(
            r#"
            SELECT id, operation, param1, param2, result, username, "timestamp"
            FROM math_requests
            ORDER BY "timestamp" DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(AuditRow::into_record).collect())
    }
}
