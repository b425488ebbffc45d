use redis::Client;
use redis::aio::ConnectionManager;
use tracing::{debug, info};

use super::RedisConfig;
use crate::common::{DatabaseError, RetryConfig, retry_with_backoff};

/// Open a `ConnectionManager` and verify it with `PING`.
pub async fn connect(config: &RedisConfig) -> redis::RedisResult<ConnectionManager> {
    let client = Client::open(config.url.as_str())?;
    let mut manager = ConnectionManager::new(client).await?;
    let _: String = redis::cmd("PING").query_async(&mut manager).await?;
    info!("Connected to Redis");
    Ok(manager)
}

pub async fn connect_with_retry(
    config: &RedisConfig,
    retry: Option<RetryConfig>,
) -> redis::RedisResult<ConnectionManager> {
    let retry = retry.unwrap_or_default();
    retry_with_backoff("redis", &retry, || connect(config)).await
}

pub async fn check_health(manager: &ConnectionManager) -> Result<(), DatabaseError> {
    let mut conn = manager.clone();
    let pong: String = redis::cmd("PING")
        .query_async(&mut conn)
        .await
        .map_err(|e| DatabaseError::unhealthy("redis", e))?;
    if pong != "PONG" {
        return Err(DatabaseError::unhealthy(
            "redis",
            format!("unexpected PING reply {pong}"),
        ));
    }
    debug!("Redis health check passed");
    Ok(())
}
