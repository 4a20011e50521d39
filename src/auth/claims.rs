/// JWT Claims structure
///
/// Payload of an access token: registered claims only (RFC 7519) plus a
/// random `jti` so tokens minted in the same second still differ.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::jwt::TokenError;

/// JWT Claims for access tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Issuer
    pub iss: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Unique token id
    pub jti: String,
}

impl Claims {
    /// Build claims for `user_id`, valid from `issued_at` for `ttl`.
    pub fn new(user_id: Uuid, issuer: &str, issued_at: DateTime<Utc>, ttl: Duration) -> Self {
        let iat = issued_at.timestamp();
        Self {
            sub: user_id.to_string(),
            iss: issuer.to_string(),
            iat,
            exp: iat + ttl.num_seconds(),
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Extract user ID from claims
    ///
    /// # Errors
    /// Returns `InvalidSubject` if the subject is not a UUID or is the nil UUID
    pub fn user_id(&self) -> Result<Uuid, TokenError> {
        match Uuid::parse_str(&self.sub) {
            Ok(id) if !id.is_nil() => Ok(id),
            _ => Err(TokenError::InvalidSubject),
        }
    }

    /// A token is dead at its expiry second, not after it
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.exp <= now
    }
}
