//! Admin seeding for initial setup.
//!
//! The admin account is created out of band, never through `/register`
//! (its username is the reserved identifier that registration refuses).

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use auth::{hash_password, User, UserRole, UserStore};

/// Create the admin user if it does not exist yet. Idempotent.
///
/// Returns true when a user was created.
pub async fn seed_admin(
    store: Arc<dyn UserStore>,
    username: &str,
    password: &str,
) -> anyhow::Result<bool> {
    if store.find_by_username(username).await?.is_some() {
        tracing::info!(username = %username, "Admin user already exists, skipping seed");
        return Ok(false);
    }

    let user = User {
        id: Uuid::new_v4(),
        username: username.to_string(),
        password_hash: hash_password(password)?,
        role: UserRole::Admin,
        created_at: Utc::now(),
    };
    store.insert(&user).await?;

    tracing::info!(user_id = %user.id, username = %username, "Admin user created");

    Ok(true)
}

/// Seed the admin from `ADMIN_USERNAME` / `ADMIN_PASSWORD`.
///
/// Defaults to `admin`/`admin` for local development, matching the
/// reserved username that registration protects.
pub async fn seed_admin_from_env(store: Arc<dyn UserStore>) -> anyhow::Result<()> {
    let username = std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
    let password = std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin".to_string());

    seed_admin(store, &username, &password).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use auth::MemoryUserStore;

    #[tokio::test]
    async fn test_seed_creates_admin_once() {
        let store: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new());

        assert!(seed_admin(store.clone(), "admin", "adminpass").await.unwrap());
        // Second run is a no-op, not an error.
        assert!(!seed_admin(store.clone(), "admin", "adminpass").await.unwrap());

        let admin = store.find_by_username("admin").await.unwrap().unwrap();
        assert_eq!(admin.role, UserRole::Admin);
        assert!(auth::verify_password("adminpass", &admin.password_hash));
    }
}
