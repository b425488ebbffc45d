use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use super::store::{AccessTokenRecord, RefreshTokenRecord, TokenStore};
use crate::error::{UserError, UserResult};

fn access_key(id: Uuid) -> String {
    format!("oauth:access:{id}")
}

fn refresh_key(id: Uuid) -> String {
    format!("oauth:refresh:{id}")
}

fn revoked_key(id: Uuid) -> String {
    format!("oauth:revoked:{id}")
}

fn chain_key(access_token_id: Uuid) -> String {
    format!("oauth:access:{access_token_id}:refresh_tokens")
}

/// Seconds until `expires_at`, at least one so the key is still written
fn ttl_secs(expires_at: DateTime<Utc>) -> u64 {
    (expires_at - Utc::now()).num_seconds().max(1) as u64
}

/// Token store in Redis.
///
/// Records live under `oauth:access:{id}` / `oauth:refresh:{id}` and expire
/// with the token. Revocation writes an `oauth:revoked:{id}` marker with the
/// same TTL rather than rewriting the record.
#[derive(Clone)]
pub struct RedisTokenStore {
    redis: ConnectionManager,
}

impl RedisTokenStore {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    async fn put<T: Serialize>(&self, key: &str, value: &T, ttl: u64) -> UserResult<()> {
        let mut conn = self.redis.clone();
        let payload = serde_json::to_string(value)
            .map_err(|e| UserError::Internal(format!("Failed to serialize token: {e}")))?;
        conn.set_ex::<_, _, ()>(key, payload, ttl).await?;
        Ok(())
    }

    async fn get<T: DeserializeOwned>(&self, key: &str) -> UserResult<Option<T>> {
        let mut conn = self.redis.clone();
        let raw: Option<String> = conn.get(key).await?;
        raw.map(|v| {
            serde_json::from_str(&v)
                .map_err(|e| UserError::Internal(format!("Corrupt token record: {e}")))
        })
        .transpose()
    }

    async fn is_revoked(&self, id: Uuid) -> UserResult<bool> {
        let mut conn = self.redis.clone();
        Ok(conn.exists(revoked_key(id)).await?)
    }

    async fn mark_revoked(&self, id: Uuid, expires_at: DateTime<Utc>) -> UserResult<()> {
        let mut conn = self.redis.clone();
        conn.set_ex::<_, _, ()>(revoked_key(id), 1, ttl_secs(expires_at))
            .await?;
        Ok(())
    }

    /// `SET NX` on the revocation marker; true only for the caller that wrote it
    async fn claim_revocation(&self, id: Uuid, expires_at: DateTime<Utc>) -> UserResult<bool> {
        let mut conn = self.redis.clone();
        let written: Option<String> = redis::cmd("SET")
            .arg(revoked_key(id))
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs(expires_at))
            .query_async(&mut conn)
            .await?;
        Ok(written.is_some())
    }
}

#[async_trait]
impl TokenStore for RedisTokenStore {
    async fn store_access_token(&self, record: AccessTokenRecord) -> UserResult<()> {
        self.put(&access_key(record.id), &record, ttl_secs(record.expires_at))
            .await
    }

    async fn find_access_token(&self, id: Uuid) -> UserResult<Option<AccessTokenRecord>> {
        let Some(mut record) = self.get::<AccessTokenRecord>(&access_key(id)).await? else {
            return Ok(None);
        };
        record.revoked = record.revoked || self.is_revoked(id).await?;
        Ok(Some(record))
    }

    async fn revoke_access_token(&self, id: Uuid) -> UserResult<bool> {
        match self.get::<AccessTokenRecord>(&access_key(id)).await? {
            Some(record) => {
                self.mark_revoked(id, record.expires_at).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn store_refresh_token(&self, record: RefreshTokenRecord) -> UserResult<()> {
        let ttl = ttl_secs(record.expires_at);
        self.put(&refresh_key(record.id), &record, ttl).await?;

        let mut conn = self.redis.clone();
        let chain = chain_key(record.access_token_id);
        conn.sadd::<_, _, ()>(&chain, record.id.to_string()).await?;
        conn.expire::<_, ()>(&chain, ttl as i64).await?;
        Ok(())
    }

    async fn find_refresh_token(&self, id: Uuid) -> UserResult<Option<RefreshTokenRecord>> {
        let Some(mut record) = self.get::<RefreshTokenRecord>(&refresh_key(id)).await? else {
            return Ok(None);
        };
        record.revoked = record.revoked || self.is_revoked(id).await?;
        Ok(Some(record))
    }

    async fn revoke_refresh_token(&self, id: Uuid) -> UserResult<bool> {
        match self.get::<RefreshTokenRecord>(&refresh_key(id)).await? {
            Some(record) if !record.revoked => self.claim_revocation(id, record.expires_at).await,
            _ => Ok(false),
        }
    }

    async fn revoke_refresh_tokens_by_access_token_id(
        &self,
        access_token_id: Uuid,
    ) -> UserResult<u64> {
        let mut conn = self.redis.clone();
        let members: Vec<String> = conn.smembers(chain_key(access_token_id)).await?;

        let mut revoked = 0;
        for id in members.iter().filter_map(|m| Uuid::parse_str(m).ok()) {
            if self.revoke_refresh_token(id).await? {
                revoked += 1;
            }
        }
        Ok(revoked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_key_layout() {
        let id = Uuid::nil();
        assert_eq!(access_key(id), format!("oauth:access:{id}"));
        assert_eq!(refresh_key(id), format!("oauth:refresh:{id}"));
        assert_eq!(revoked_key(id), format!("oauth:revoked:{id}"));
        assert_eq!(chain_key(id), format!("oauth:access:{id}:refresh_tokens"));
    }

    #[test]
    fn test_ttl_never_zero() {
        assert_eq!(ttl_secs(Utc::now() - Duration::hours(1)), 1);
        assert!(ttl_secs(Utc::now() + Duration::hours(1)) > 3500);
    }
}
