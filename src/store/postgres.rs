//! Postgres-backed stores.
//!
//! Schema lives in `migrations/`. Refresh tokens are keyed by their SHA-256
//! digest; the plaintext only ever exists in the client and in transit.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{hash_token, HashedCredential, RefreshToken};
use crate::error::StoreError;
use crate::store::{RefreshTokenStore, User, UserStore};

type UserRow = (Uuid, String, String, DateTime<Utc>, DateTime<Utc>, bool);

fn user_from_row(row: UserRow) -> User {
    let (id, email, password_hash, created_at, updated_at, is_chirpy_red) = row;
    User {
        id,
        email,
        password_hash: HashedCredential::from_stored(password_hash),
        created_at,
        updated_at,
        is_chirpy_red,
    }
}

fn not_found_as(what: &'static str) -> impl Fn(StoreError) -> StoreError {
    move |err| match err {
        StoreError::NotFound(_) => StoreError::NotFound(what),
        other => other,
    }
}

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(
        &self,
        email: &str,
        password_hash: &HashedCredential,
    ) -> Result<User, StoreError> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, email, hashed_password, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING id, email, hashed_password, created_at, updated_at, is_chirpy_red
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(user_from_row(row))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, hashed_password, created_at, updated_at, is_chirpy_red
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound("user"))?;

        Ok(user_from_row(row))
    }

    async fn get_user_by_id(&self, id: Uuid) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, hashed_password, created_at, updated_at, is_chirpy_red
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound("user"))?;

        Ok(user_from_row(row))
    }

    async fn update_user(
        &self,
        id: Uuid,
        email: &str,
        password_hash: &HashedCredential,
    ) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users
            SET email = $2, hashed_password = $3, updated_at = $4
            WHERE id = $1
            RETURNING id, email, hashed_password, created_at, updated_at, is_chirpy_red
            "#,
        )
        .bind(id)
        .bind(email)
        .bind(password_hash.as_str())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from)
        .map_err(not_found_as("user"))?;

        Ok(user_from_row(row))
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), StoreError> {
        // refresh_tokens.user_id cascades
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("user"));
        }
        Ok(())
    }

    async fn delete_all_users(&self) -> Result<(), StoreError> {
        // refresh_tokens.user_id cascades
        sqlx::query("DELETE FROM users").execute(&self.pool).await?;
        tracing::info!("All users deleted");
        Ok(())
    }
}

#[async_trait]
impl RefreshTokenStore for PgStore {
    async fn create(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshToken, StoreError> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (token_hash, user_id, created_at, updated_at, expires_at)
            VALUES ($1, $2, $3, $3, $4)
            "#,
        )
        .bind(hash_token(token))
        .bind(user_id)
        .bind(now)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(RefreshToken {
            token: token.to_string(),
            user_id,
            created_at: now,
            updated_at: now,
            expires_at,
            revoked_at: None,
        })
    }

    async fn lookup(&self, token: &str) -> Result<RefreshToken, StoreError> {
        let (user_id, created_at, updated_at, expires_at, revoked_at) = sqlx::query_as::<
            _,
            (Uuid, DateTime<Utc>, DateTime<Utc>, DateTime<Utc>, Option<DateTime<Utc>>),
        >(
            r#"
            SELECT user_id, created_at, updated_at, expires_at, revoked_at
            FROM refresh_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(hash_token(token))
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound("refresh token"))?;

        Ok(RefreshToken {
            token: token.to_string(),
            user_id,
            created_at,
            updated_at,
            expires_at,
            revoked_at,
        })
    }

    async fn revoke(&self, token: &str) -> Result<(), StoreError> {
        let token_hash = hash_token(token);

        // Conditional update: revoked_at is written at most once
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked_at = $1, updated_at = $1
            WHERE token_hash = $2 AND revoked_at IS NULL
            "#,
        )
        .bind(Utc::now())
        .bind(&token_hash)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM refresh_tokens WHERE token_hash = $1)",
        )
        .bind(&token_hash)
        .fetch_one(&self.pool)
        .await?;

        if exists {
            Ok(())
        } else {
            Err(StoreError::NotFound("refresh token"))
        }
    }

    async fn reset_all(&self) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM refresh_tokens")
            .execute(&self.pool)
            .await?;
        tracing::info!("All refresh tokens deleted");
        Ok(())
    }
}
