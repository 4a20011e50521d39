/// Session Orchestration
///
/// Composes credential hashing, the access-token codec and the persistence
/// stores into the account, login, refresh, revoke and authorization flows.
/// Nothing is cached between calls; the stores are the only durable state.
///
/// Rejections are reported with as little detail as the caller needs:
/// unknown email and wrong password are the same `InvalidCredentials`, and
/// unknown, expired and revoked refresh tokens all read as one 401.

use std::sync::Arc;

use actix_web::http::header::HeaderMap;
use actix_web::web;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::{
    extract_bearer_token, generate_opaque_secret, hash_password, needs_rehash,
    verify_dummy_password, verify_password, AccessTokenCodec, HashedCredential, RefreshTokenState,
};
use crate::configuration::{AuthSettings, Platform};
use crate::error::{AppError, AuthError, ConfigError, RefreshRejection, StoreError, ValidationError};
use crate::store::{RefreshTokenStore, User, UserStore};
use crate::validators::{is_valid_email, is_valid_password, normalize_email};

/// Longest accepted refresh-token lifetime
pub const MAX_REFRESH_TOKEN_TTL_DAYS: i64 = 3650;

/// Token lifetimes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionPolicy {
    /// Default and maximum access-token lifetime
    pub access_token_ttl: Duration,
    /// Fixed refresh-token lifetime from creation
    pub refresh_token_ttl: Duration,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            access_token_ttl: Duration::hours(1),
            refresh_token_ttl: Duration::days(60),
        }
    }
}

impl SessionPolicy {
    pub fn from_settings(settings: &AuthSettings) -> Result<Self, ConfigError> {
        let access_token_ttl = Some(settings.access_token_ttl_seconds)
            .filter(|s| *s > 0)
            .and_then(Duration::try_seconds)
            .ok_or_else(|| {
                ConfigError::InvalidValue("auth.access_token_ttl_seconds must be positive".into())
            })?;
        let refresh_token_ttl = Some(settings.refresh_token_ttl_days)
            .filter(|d| (1..=MAX_REFRESH_TOKEN_TTL_DAYS).contains(d))
            .and_then(Duration::try_days)
            .ok_or_else(|| {
                ConfigError::InvalidValue(format!(
                    "auth.refresh_token_ttl_days must be between 1 and {}",
                    MAX_REFRESH_TOKEN_TTL_DAYS
                ))
            })?;

        Ok(Self {
            access_token_ttl,
            refresh_token_ttl,
        })
    }
}

/// Public view of a user account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_chirpy_red: bool,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            created_at: user.created_at,
            updated_at: user.updated_at,
            is_chirpy_red: user.is_chirpy_red,
        }
    }
}

/// Result of a successful login
#[derive(Debug, Clone, Serialize)]
pub struct LoginSession {
    #[serde(flatten)]
    pub user: UserProfile,
    /// Access token
    pub token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct SessionService {
    users: Arc<dyn UserStore>,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    codec: AccessTokenCodec,
    policy: SessionPolicy,
    platform: Platform,
}

impl SessionService {
    pub fn new(
        users: Arc<dyn UserStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        codec: AccessTokenCodec,
        policy: SessionPolicy,
        platform: Platform,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            codec,
            policy,
            platform,
        }
    }

    pub fn policy(&self) -> &SessionPolicy {
        &self.policy
    }

    /// Create an account with a freshly hashed password
    ///
    /// # Errors
    /// - 400: empty or malformed email, empty password
    /// - 409: email already registered
    pub async fn register(&self, email: &str, password: &str) -> Result<UserProfile, AppError> {
        let email = is_valid_email(email)?;
        is_valid_password(password)?;

        let password_hash = hash_blocking(password).await?;
        let user = self.users.create_user(&email, &password_hash).await?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user.into())
    }

    /// Verify credentials and open a session.
    ///
    /// `expires_in_seconds` may shorten the access token's lifetime but never
    /// extend it past the configured default.
    ///
    /// # Errors
    /// - 400: empty email/password or non-positive `expires_in_seconds`
    /// - 401: unknown email or wrong password, indistinguishably
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        expires_in_seconds: Option<i64>,
    ) -> Result<LoginSession, AppError> {
        if email.trim().is_empty() {
            return Err(ValidationError::EmptyField("email").into());
        }
        is_valid_password(password)?;
        let access_ttl = self.resolve_access_ttl(expires_in_seconds)?;

        let user = match self.users.get_user_by_email(&normalize_email(email)).await {
            Ok(user) => user,
            Err(StoreError::NotFound(_)) => {
                // Same hashing cost as a wrong password
                let password = password.to_owned();
                web::block(move || verify_dummy_password(&password))
                    .await
                    .map_err(blocking_failed)?;
                tracing::warn!("Login attempt for unknown email");
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => return Err(e.into()),
        };

        if !verify_blocking(password, &user.password_hash).await? {
            tracing::warn!(user_id = %user.id, "Login attempt with incorrect password");
            return Err(AuthError::InvalidCredentials.into());
        }

        let user = self.upgrade_legacy_hash(user, password).await;

        let token = self.codec.issue(user.id, access_ttl)?;
        let refresh_token = self.create_refresh_token(user.id).await?;

        tracing::info!(user_id = %user.id, "User logged in");
        Ok(LoginSession {
            user: user.into(),
            token,
            refresh_token,
        })
    }

    /// Mint a new access token from the refresh token in the bearer header.
    ///
    /// The refresh token itself is left untouched.
    pub async fn refresh(&self, headers: &HeaderMap) -> Result<String, AppError> {
        let token = extract_bearer_token(headers)?;

        let record = match self.refresh_tokens.lookup(&token).await {
            Ok(record) => record,
            Err(StoreError::NotFound(_)) => {
                return Err(AuthError::RefreshToken(RefreshRejection::Unknown).into())
            }
            Err(e) => return Err(e.into()),
        };

        match record.state_at(Utc::now()) {
            RefreshTokenState::Active => {}
            RefreshTokenState::Expired => {
                return Err(AuthError::RefreshToken(RefreshRejection::Expired).into())
            }
            RefreshTokenState::Revoked => {
                tracing::warn!(user_id = %record.user_id, "Attempt to use revoked refresh token");
                return Err(AuthError::RefreshToken(RefreshRejection::Revoked).into());
            }
        }

        let access_token = self.codec.issue(record.user_id, self.policy.access_token_ttl)?;
        tracing::info!(user_id = %record.user_id, "Access token refreshed");
        Ok(access_token)
    }

    /// Revoke the refresh token in the bearer header.
    ///
    /// Unknown and already revoked tokens are acknowledged the same way as
    /// live ones.
    pub async fn revoke(&self, headers: &HeaderMap) -> Result<(), AppError> {
        let token = extract_bearer_token(headers)?;

        match self.refresh_tokens.revoke(&token).await {
            Ok(()) => {
                tracing::info!("Refresh token revoked");
                Ok(())
            }
            Err(StoreError::NotFound(_)) => {
                tracing::debug!("Revoke requested for unknown refresh token");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Verify the access token in the bearer header and return its subject
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Uuid, AppError> {
        let token = extract_bearer_token(headers)?;
        Ok(self.codec.verify(&token)?)
    }

    /// Require an authenticated caller to own the resource.
    ///
    /// `caller` comes from `authenticate`; a mismatch is 403, not 401.
    pub fn authorize_owner(&self, caller: Uuid, owner_id: Uuid) -> Result<(), AppError> {
        if caller != owner_id {
            tracing::warn!(user_id = %caller, owner_id = %owner_id, "Mutation denied for non-owner");
            return Err(AuthError::Forbidden("resource belongs to another user").into());
        }
        Ok(())
    }

    /// Delete a user account on behalf of `caller`.
    ///
    /// # Errors
    /// - 404: no such account
    /// - 403: the account belongs to someone else; nothing is deleted
    pub async fn delete_user(&self, caller: Uuid, user_id: Uuid) -> Result<(), AppError> {
        let record = self.users.get_user_by_id(user_id).await?;
        self.authorize_owner(caller, record.id)?;

        self.users.delete_user(record.id).await?;
        tracing::info!(user_id = %record.id, "User deleted");
        Ok(())
    }

    /// Replace the caller's email and password
    pub async fn update_credentials(
        &self,
        user_id: Uuid,
        email: &str,
        password: &str,
    ) -> Result<UserProfile, AppError> {
        let email = is_valid_email(email)?;
        is_valid_password(password)?;

        let password_hash = hash_blocking(password).await?;
        let user = self
            .users
            .update_user(user_id, &email, &password_hash)
            .await?;

        tracing::info!(user_id = %user.id, "User credentials updated");
        Ok(user.into())
    }

    /// Wipe all users and refresh tokens. Only allowed on the dev platform.
    pub async fn reset(&self) -> Result<(), AppError> {
        if !self.platform.allows_reset() {
            return Err(AuthError::Forbidden("reset is only available on the dev platform").into());
        }

        self.refresh_tokens.reset_all().await?;
        self.users.delete_all_users().await?;

        tracing::warn!("All users and refresh tokens reset");
        Ok(())
    }

    fn resolve_access_ttl(&self, requested: Option<i64>) -> Result<Duration, ValidationError> {
        let default = self.policy.access_token_ttl;
        match requested {
            None => Ok(default),
            Some(seconds) if seconds <= 0 => Err(ValidationError::NotPositive("expires_in_seconds")),
            Some(seconds) => Ok(Duration::try_seconds(seconds).map_or(default, |ttl| ttl.min(default))),
        }
    }

    async fn create_refresh_token(&self, user_id: Uuid) -> Result<String, AppError> {
        let token = generate_opaque_secret()
            .map_err(|e| AppError::Internal(format!("refresh token generation failed: {}", e)))?;
        let expires_at = Utc::now()
            .checked_add_signed(self.policy.refresh_token_ttl)
            .ok_or_else(|| AppError::Internal("refresh token expiry out of range".to_string()))?;

        self.refresh_tokens.create(&token, user_id, expires_at).await?;
        Ok(token)
    }

    /// Re-hash a legacy (non-Argon2) password after it verified.
    ///
    /// Login still succeeds when the upgrade fails; the next login retries.
    async fn upgrade_legacy_hash(&self, user: User, password: &str) -> User {
        if !needs_rehash(&user.password_hash) {
            return user;
        }

        let upgraded = match hash_blocking(password).await {
            Ok(hash) => self.users.update_user(user.id, &user.email, &hash).await.map_err(AppError::from),
            Err(e) => Err(e),
        };

        match upgraded {
            Ok(updated) => {
                tracing::info!(user_id = %updated.id, "Upgraded legacy password hash");
                updated
            }
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "Legacy password hash upgrade failed");
                user
            }
        }
    }
}

// Argon2 runs on the blocking pool, off the worker event loop

fn blocking_failed(err: actix_web::error::BlockingError) -> AppError {
    AppError::Internal(format!("blocking task failed: {}", err))
}

async fn hash_blocking(password: &str) -> Result<HashedCredential, AppError> {
    let password = password.to_owned();
    let hash = web::block(move || hash_password(&password))
        .await
        .map_err(blocking_failed)??;
    Ok(hash)
}

async fn verify_blocking(password: &str, stored: &HashedCredential) -> Result<bool, AppError> {
    let password = password.to_owned();
    let stored = stored.clone();
    let matches = web::block(move || verify_password(&password, &stored))
        .await
        .map_err(blocking_failed)??;
    Ok(matches)
}
