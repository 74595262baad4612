//! Reviewer authentication
//!
//! Review endpoints take an HS256 bearer token signed with `API_JWT_SECRET`
//! (`onboarding-api issue-token` mints one). The subject becomes the
//! `reviewedBy` of every decision made with it.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Issuer stamped into and required from every token
pub const TOKEN_ISSUER: &str = "onboarding-api";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Reviewer identity
    pub sub: String,
    pub roles: Vec<String>,
    pub iss: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    /// True if the token grants `role`, directly or through `admin`
    pub fn has_role(&self, role: &str) -> bool {
        self.roles
            .iter()
            .any(|granted| granted == role || granted == permissions::ADMIN)
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Token could not be signed")]
    SigningFailed,
}

/// Signs a token for `subject` valid for `ttl_secs`
pub fn create_token(
    subject: &str,
    roles: Vec<String>,
    secret: &str,
    ttl_secs: u64,
) -> Result<String, AuthError> {
    let issued_at = Utc::now();
    let ttl = i64::try_from(ttl_secs).unwrap_or(i64::MAX / 1000);
    let claims = Claims {
        sub: subject.to_string(),
        roles,
        iss: TOKEN_ISSUER.to_string(),
        exp: (issued_at + Duration::seconds(ttl)).timestamp(),
        iat: issued_at.timestamp(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthError::SigningFailed)
}

/// Verifies signature, issuer and expiry
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[TOKEN_ISSUER]);

    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })
}

pub mod permissions {
    /// Move applications through review and read review queues
    pub const ONBOARDING_REVIEW: &str = "onboarding:review";
    /// Implies every other role
    pub const ADMIN: &str = "admin";
}
