/// Refresh Token Records
///
/// Refresh tokens are opaque random strings persisted by a
/// [`RefreshTokenStore`](crate::store::RefreshTokenStore). Usability is derived
/// from the stored timestamps, never from a stored status column:
/// - `revoked_at` set -> Revoked (regardless of expiry)
/// - `now >= expires_at` -> Expired
/// - otherwise -> Active
///
/// Neither Revoked nor Expired ever returns to Active.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Persisted refresh token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshToken {
    pub token: String,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTokenState {
    Active,
    Expired,
    Revoked,
}

impl RefreshToken {
    pub fn state_at(&self, now: DateTime<Utc>) -> RefreshTokenState {
        if self.revoked_at.is_some() {
            RefreshTokenState::Revoked
        } else if now >= self.expires_at {
            RefreshTokenState::Expired
        } else {
            RefreshTokenState::Active
        }
    }
}

/// SHA-256 hex digest of a refresh token.
///
/// Database-backed stores key rows by this digest so a leaked table does not
/// leak live tokens.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}
