//! Signed, time-limited access tokens.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{FilestoreError, Result};

/// Upper bound on token lifetime (ten years).
const MAX_LIFETIME_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (username).
    pub sub: String,
    /// User ID.
    pub uid: i64,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
    /// Token ID, unique per issuance.
    pub jti: String,
}

/// A freshly issued token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and checks HS256 tokens with a shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, lifetime_secs: u64) -> Self {
        let mut validation = Validation::default();
        validation.validate_exp = true;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            lifetime: Duration::seconds(lifetime_secs.min(MAX_LIFETIME_SECS) as i64),
        }
    }

    /// Issue a token for a user.
    pub fn issue(&self, user_id: i64, username: &str) -> Result<IssuedToken> {
        let now = Utc::now();
        let expires_at = now + self.lifetime;
        let claims = TokenClaims {
            sub: username.to_string(),
            uid: user_id,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let token = self.sign(&claims)?;
        Ok(IssuedToken { token, expires_at })
    }

    /// Sign arbitrary claims.
    pub fn sign(&self, claims: &TokenClaims) -> Result<String> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| FilestoreError::Internal(format!("failed to sign token: {e}")))
    }

    /// Check the signature and expiry of a token and return its claims.
    pub fn decode(&self, token: &str) -> Result<TokenClaims> {
        decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Token validation failed: {}", e);
                FilestoreError::Auth("invalid or expired token".to_string())
            })
    }
}
