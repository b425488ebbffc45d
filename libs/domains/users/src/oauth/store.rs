use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::UserResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessTokenRecord {
    /// The `jti` claim of the issued JWT
    pub id: Uuid,
    pub user_id: Uuid,
    pub client_id: String,
    pub scopes: String,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub access_token_id: Uuid,
    pub revoked: bool,
    pub expires_at: DateTime<Utc>,
}

impl AccessTokenRecord {
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && self.expires_at > now
    }
}

impl RefreshTokenRecord {
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && self.expires_at > now
    }
}

/// Persistence and revocation of issued tokens
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn store_access_token(&self, record: AccessTokenRecord) -> UserResult<()>;

    async fn find_access_token(&self, id: Uuid) -> UserResult<Option<AccessTokenRecord>>;

    /// Returns false when no such token exists. Revoking twice is not an error.
    async fn revoke_access_token(&self, id: Uuid) -> UserResult<bool>;

    async fn store_refresh_token(&self, record: RefreshTokenRecord) -> UserResult<()>;

    async fn find_refresh_token(&self, id: Uuid) -> UserResult<Option<RefreshTokenRecord>>;

    /// Atomically revoke a live refresh token. Returns false when it does not
    /// exist or was already revoked, so at most one caller ever sees true.
    async fn revoke_refresh_token(&self, id: Uuid) -> UserResult<bool>;

    /// Revoke every refresh token issued alongside the access token; returns how many were revoked
    async fn revoke_refresh_tokens_by_access_token_id(&self, access_token_id: Uuid)
    -> UserResult<u64>;
}

#[derive(Debug, Default)]
struct Tokens {
    access: HashMap<Uuid, AccessTokenRecord>,
    refresh: HashMap<Uuid, RefreshTokenRecord>,
}

/// In-memory token store (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryTokenStore {
    tokens: Arc<RwLock<Tokens>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn store_access_token(&self, record: AccessTokenRecord) -> UserResult<()> {
        self.tokens.write().await.access.insert(record.id, record);
        Ok(())
    }

    async fn find_access_token(&self, id: Uuid) -> UserResult<Option<AccessTokenRecord>> {
        Ok(self.tokens.read().await.access.get(&id).cloned())
    }

    async fn revoke_access_token(&self, id: Uuid) -> UserResult<bool> {
        let mut tokens = self.tokens.write().await;
        Ok(match tokens.access.get_mut(&id) {
            Some(record) => {
                record.revoked = true;
                true
            }
            None => false,
        })
    }

    async fn store_refresh_token(&self, record: RefreshTokenRecord) -> UserResult<()> {
        self.tokens.write().await.refresh.insert(record.id, record);
        Ok(())
    }

    async fn find_refresh_token(&self, id: Uuid) -> UserResult<Option<RefreshTokenRecord>> {
        Ok(self.tokens.read().await.refresh.get(&id).cloned())
    }

    async fn revoke_refresh_token(&self, id: Uuid) -> UserResult<bool> {
        let mut tokens = self.tokens.write().await;
        Ok(match tokens.refresh.get_mut(&id) {
            Some(record) if !record.revoked => {
                record.revoked = true;
                true
            }
            _ => false,
        })
    }

    async fn revoke_refresh_tokens_by_access_token_id(
        &self,
        access_token_id: Uuid,
    ) -> UserResult<u64> {
        let mut tokens = self.tokens.write().await;
        let mut revoked = 0;
        for record in tokens
            .refresh
            .values_mut()
            .filter(|r| r.access_token_id == access_token_id && !r.revoked)
        {
            record.revoked = true;
            revoked += 1;
        }
        Ok(revoked)
    }
}
