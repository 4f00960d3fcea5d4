//! Authentication
//!
//! Credential storage, argon2 password hashing, and signed-token
//! issuance/validation with role-based claims.

pub mod credentials;
pub mod jwt;
pub mod user_storage_pg;

pub use credentials::{
    hash_password, verify_password, CredentialError, CredentialService, MemoryUserStore, User,
    UserStore,
};
pub use jwt::{Claims, TokenConfig, TokenService, UserRole};
pub use user_storage_pg::PostgresUserStore;
