//! PostgreSQL storage backend for user records.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::credentials::{User, UserStore};
use crate::jwt::UserRole;

/// PostgreSQL-backed user storage.
pub struct PostgresUserStore {
    pool: PgPool,
}

impl PostgresUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row for users.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    password_hash: String,
    role: i16,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> User {
        User {
            id: self.id,
            username: self.username,
            password_hash: self.password_hash,
            role: role_from_i16(self.role),
            created_at: self.created_at,
        }
    }
}

fn role_from_i16(role: i16) -> UserRole {
    match role {
        1 => UserRole::Admin,
        _ => UserRole::User,
    }
}

fn role_to_i16(role: UserRole) -> i16 {
    match role {
        UserRole::User => 0,
        UserRole::Admin => 1,
    }
}

#[async_trait]
impl UserStore for PostgresUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let row: Option<UserRow> = sqlx::query_as(
            r#"
            SELECT id, username, password_hash, role, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserRow::into_user))
    }

    async fn insert(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, password_hash, role, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(role_to_i16(user.role))
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
