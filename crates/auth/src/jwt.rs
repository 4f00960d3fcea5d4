//! Signed, self-contained access tokens.

use anyhow::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Platform roles carried inside tokens and stored on users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Regular account: may call the computation endpoints.
    #[default]
    User,
    /// Administrator: additionally reads audit records, logs and metrics.
    Admin,
}

impl UserRole {
    /// Check if this role can access the admin surface.
    pub fn can_administer(&self) -> bool {
        matches!(self, UserRole::Admin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }
}

/// JWT claims payload.
///
/// Tokens are stateless bearers of identity: nothing here is persisted,
/// and a token stays valid until `exp` regardless of logout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (username).
    pub sub: String,
    /// Role at issuance time.
    pub role: UserRole,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
    /// JWT ID (unique identifier for this token).
    pub jti: String,
}

impl Claims {
    /// Create new claims for a user.
    pub fn new(username: impl Into<String>, role: UserRole, ttl_minutes: i64) -> Self {
        let now = Utc::now();
        Self {
            sub: username.into(),
            role,
            iat: now.timestamp(),
            exp: (now + Duration::minutes(ttl_minutes)).timestamp(),
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Check if the token is expired.
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

/// Configuration for token issuance and validation.
#[derive(Clone)]
pub struct TokenConfig {
    /// Secret key for signing tokens.
    pub secret: String,
    /// Token lifetime in minutes.
    pub ttl_minutes: i64,
    /// Issuer claim.
    pub issuer: Option<String>,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: "change-me-in-production".to_string(),
            ttl_minutes: 30,
            issuer: None,
        }
    }
}

/// Issues and validates signed tokens.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    config: TokenConfig,
    validation: Validation,
}

impl TokenService {
    pub fn new(config: TokenConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        let mut validation = Validation::default();
        if let Some(ref iss) = config.issuer {
            validation.set_issuer(&[iss]);
        }

        Self {
            encoding_key,
            decoding_key,
            config,
            validation,
        }
    }

    /// Issue a token for a user.
    pub fn issue(&self, username: &str, role: UserRole) -> Result<String> {
        let claims = Claims::new(username, role, self.config.ttl_minutes);
        let token = encode(&Header::default(), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Issue a token from prebuilt claims.
    pub fn issue_with_claims(&self, claims: &Claims) -> Result<String> {
        let token = encode(&Header::default(), claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Verify signature and expiry, returning the embedded claims.
    pub fn validate(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims)
    }
}
