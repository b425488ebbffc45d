//! Disposable Redis for the token store tests.

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::redis::Redis;

const REDIS_TAG: &str = "8-alpine";

/// A Redis 8 container plus a `ConnectionManager` to it.
///
/// Dropping the value removes the container.
///
/// ```no_run
/// use test_utils::TestRedis;
///
/// # async fn example() {
/// let redis = TestRedis::new().await;
/// let manager = redis.connection();
/// assert!(redis.keys("oauth:*").await.is_empty());
/// # }
/// ```
pub struct TestRedis {
    _container: ContainerAsync<Redis>,
    connection: ConnectionManager,
    connection_string: String,
}

impl TestRedis {
    pub async fn new() -> Self {
        let container = Redis::default()
            .with_tag(REDIS_TAG)
            .start()
            .await
            .expect("Redis container should start");
        let port = container
            .get_host_port_ipv4(6379)
            .await
            .expect("Redis port should be mapped");

        let connection_string = format!("redis://127.0.0.1:{port}");
        let client = Client::open(connection_string.as_str()).expect("Redis URL should parse");
        let connection = ConnectionManager::new(client)
            .await
            .expect("test Redis should accept connections");

        tracing::info!(port, tag = REDIS_TAG, "Test Redis ready");
        Self {
            _container: container,
            connection,
            connection_string,
        }
    }

    pub fn connection(&self) -> ConnectionManager {
        self.connection.clone()
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }

    /// Sorted keys matching a glob pattern
    pub async fn keys(&self, pattern: &str) -> Vec<String> {
        let mut conn = self.connection();
        let mut keys: Vec<String> = conn.keys(pattern).await.expect("KEYS should succeed");
        keys.sort();
        keys
    }

    /// Remaining lifetime in seconds; -1 without expiry, -2 when missing
    pub async fn ttl(&self, key: &str) -> i64 {
        let mut conn = self.connection();
        conn.ttl(key).await.expect("TTL should succeed")
    }
}
