//! Persistence contracts consumed by the session layer.
//!
//! Both traits are object safe so the service can hold `Arc<dyn ...>` and
//! swap the Postgres backend for the in-memory one in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::{HashedCredential, RefreshToken};
use crate::error::StoreError;

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// Stored user account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: HashedCredential,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_chirpy_red: bool,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. Duplicate email is `StoreError::Conflict`.
    async fn create_user(
        &self,
        email: &str,
        password_hash: &HashedCredential,
    ) -> Result<User, StoreError>;

    async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError>;

    async fn get_user_by_id(&self, id: Uuid) -> Result<User, StoreError>;

    /// Replace email and password hash, bumping `updated_at`
    async fn update_user(
        &self,
        id: Uuid,
        email: &str,
        password_hash: &HashedCredential,
    ) -> Result<User, StoreError>;

    /// Remove one user and their refresh tokens. Unknown id is `StoreError::NotFound`.
    async fn delete_user(&self, id: Uuid) -> Result<(), StoreError>;

    /// Remove every user (and anything owned by them)
    async fn delete_all_users(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn create(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshToken, StoreError>;

    /// `StoreError::NotFound` when no such token was ever issued
    async fn lookup(&self, token: &str) -> Result<RefreshToken, StoreError>;

    /// Set `revoked_at = now` unless already set.
    ///
    /// Revoking twice succeeds and keeps the first timestamp; unknown tokens
    /// report `StoreError::NotFound`.
    async fn revoke(&self, token: &str) -> Result<(), StoreError>;

    async fn reset_all(&self) -> Result<(), StoreError>;
}
