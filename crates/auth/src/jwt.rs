//! HS256 bearer tokens.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use loyalty_core::UserId;

use crate::claims::{JwtClaims, TokenValidationError, validate_claims};

/// Lifetime of an issued token, in hours.
pub const TOKEN_LIFETIME_HOURS: i64 = 24;

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("token signing failed: {0}")]
    Signing(String),

    #[error("malformed or tampered token: {0}")]
    Malformed(String),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

/// Issues tokens for authenticated users.
pub trait JwtIssuer: Send + Sync {
    fn issue(&self, user_id: UserId) -> Result<String, JwtError>;
}

/// Verifies a bearer token and returns its claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str) -> Result<JwtClaims, JwtError>;
}

/// Symmetric HS256 signer/verifier built from a shared secret.
#[derive(Clone)]
pub struct Hs256Jwt {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl Hs256Jwt {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            lifetime: Duration::hours(TOKEN_LIFETIME_HOURS),
        }
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn issue_at(&self, user_id: UserId, now: DateTime<Utc>) -> Result<String, JwtError> {
        let claims = JwtClaims::new(user_id, now, self.lifetime);
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| JwtError::Signing(e.to_string()))
    }

    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, JwtError> {
        // Expiry lives in our own claim names and is checked by validate_claims.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.decoding, &validation)
            .map_err(|e| JwtError::Malformed(e.to_string()))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

impl JwtIssuer for Hs256Jwt {
    fn issue(&self, user_id: UserId) -> Result<String, JwtError> {
        self.issue_at(user_id, Utc::now())
    }
}

impl JwtValidator for Hs256Jwt {
    fn validate(&self, token: &str) -> Result<JwtClaims, JwtError> {
        self.validate_at(token, Utc::now())
    }
}
