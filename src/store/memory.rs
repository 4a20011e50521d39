//! In-process store for tests and local runs.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::{HashedCredential, RefreshToken};
use crate::error::StoreError;
use crate::store::{RefreshTokenStore, User, UserStore};

#[derive(Debug, Default)]
pub struct InMemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    refresh_tokens: RwLock<HashMap<String, RefreshToken>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn create_user(
        &self,
        email: &str,
        password_hash: &HashedCredential,
    ) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == email) {
            return Err(StoreError::Conflict(format!("email {} already registered", email)));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.clone(),
            created_at: now,
            updated_at: now,
            is_chirpy_red: false,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(StoreError::NotFound("user"))
    }

    async fn get_user_by_id(&self, id: Uuid) -> Result<User, StoreError> {
        self.users
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound("user"))
    }

    async fn update_user(
        &self,
        id: Uuid,
        email: &str,
        password_hash: &HashedCredential,
    ) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == email && u.id != id) {
            return Err(StoreError::Conflict(format!("email {} already registered", email)));
        }

        let user = users.get_mut(&id).ok_or(StoreError::NotFound("user"))?;
        user.email = email.to_string();
        user.password_hash = password_hash.clone();
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), StoreError> {
        // Same lock order as delete_all_users
        let mut tokens = self.refresh_tokens.write().await;
        let mut users = self.users.write().await;
        users.remove(&id).ok_or(StoreError::NotFound("user"))?;
        tokens.retain(|_, token| token.user_id != id);
        Ok(())
    }

    async fn delete_all_users(&self) -> Result<(), StoreError> {
        // Tokens belong to users
        self.refresh_tokens.write().await.clear();
        self.users.write().await.clear();
        Ok(())
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryStore {
    async fn create(
        &self,
        token: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<RefreshToken, StoreError> {
        let mut tokens = self.refresh_tokens.write().await;
        if tokens.contains_key(token) {
            return Err(StoreError::Conflict("refresh token already exists".to_string()));
        }

        let now = Utc::now();
        let record = RefreshToken {
            token: token.to_string(),
            user_id,
            created_at: now,
            updated_at: now,
            expires_at,
            revoked_at: None,
        };
        tokens.insert(record.token.clone(), record.clone());
        Ok(record)
    }

    async fn lookup(&self, token: &str) -> Result<RefreshToken, StoreError> {
        self.refresh_tokens
            .read()
            .await
            .get(token)
            .cloned()
            .ok_or(StoreError::NotFound("refresh token"))
    }

    async fn revoke(&self, token: &str) -> Result<(), StoreError> {
        let mut tokens = self.refresh_tokens.write().await;
        let record = tokens
            .get_mut(token)
            .ok_or(StoreError::NotFound("refresh token"))?;

        if record.revoked_at.is_none() {
            let now = Utc::now();
            record.revoked_at = Some(now);
            record.updated_at = now;
        }
        Ok(())
    }

    async fn reset_all(&self) -> Result<(), StoreError> {
        self.refresh_tokens.write().await.clear();
        Ok(())
    }
}
