//! Credential storage and password verification.

use anyhow::Result;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::jwt::UserRole;

/// A registered identity.
///
/// Usernames are unique and case-sensitive as stored; the role is the
/// only mutable field and changes out of band (admin seeding).
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

/// Errors from registration and login.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Username is reserved")]
    ReservedName,

    #[error("Username already registered")]
    DuplicateUser,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Storage backend for user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Exact-username lookup.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Insert a new user. The backing store enforces username uniqueness.
    async fn insert(&self, user: &User) -> Result<()>;
}

/// In-memory user storage for testing.
#[derive(Default)]
pub struct MemoryUserStore {
    users: tokio::sync::RwLock<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.username == username).cloned())
    }

    async fn insert(&self, user: &User) -> Result<()> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.username == user.username) {
            anyhow::bail!("username already exists");
        }
        users.push(user.clone());
        Ok(())
    }
}

/// Hash a password with argon2 and a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

/// Verify a password against a stored argon2 hash.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Registration and login over a [`UserStore`].
pub struct CredentialService {
    store: Arc<dyn UserStore>,
    reserved_username: String,
}

impl CredentialService {
    /// `reserved_username` is the protected identifier (the seeded admin
    /// account) that registration refuses case-insensitively. The check
    /// applies uniformly, whatever token transport the deployment uses.
    pub fn new(store: Arc<dyn UserStore>, reserved_username: impl Into<String>) -> Self {
        Self {
            store,
            reserved_username: reserved_username.into(),
        }
    }

    pub fn store(&self) -> Arc<dyn UserStore> {
        self.store.clone()
    }

    /// Register a new user with role [`UserRole::User`].
    pub async fn register(&self, username: &str, password: &str) -> Result<Uuid, CredentialError> {
        if username.to_lowercase() == self.reserved_username.to_lowercase() {
            return Err(CredentialError::ReservedName);
        }

        if self.store.find_by_username(username).await?.is_some() {
            return Err(CredentialError::DuplicateUser);
        }

        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: hash_password(password)?,
            role: UserRole::User,
            created_at: Utc::now(),
        };
        self.store.insert(&user).await?;

        Ok(user.id)
    }

    /// Verify username and password, returning the stored user.
    ///
    /// The error never reveals whether the username or the password was
    /// wrong.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, CredentialError> {
        let user = self
            .store
            .find_by_username(username)
            .await?
            .ok_or(CredentialError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash) {
            return Err(CredentialError::InvalidCredentials);
        }

        Ok(user)
    }
}
