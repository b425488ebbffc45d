//! Backing stores selected from configuration.
//!
//! PostgreSQL holds users (and tokens when Redis is absent); without a
//! database both live in memory.

use crate::config::Config;
use database::postgres::{self, DatabaseConnection};
use database::redis::{self as redis_store, ConnectionManager};
use domain_users::{InMemoryTokenStore, PgTokenStore, RedisTokenStore, TokenStore};
use eyre::eyre;
use migration::Migrator;
use std::sync::Arc;
use tracing::info;

/// Connections shared by the routers and the shutdown cleanup
#[derive(Clone, Default)]
pub struct Backends {
    pub db: Option<DatabaseConnection>,
    pub redis: Option<ConnectionManager>,
}

impl Backends {
    /// Connect to every configured store concurrently and apply migrations.
    pub async fn connect(config: &Config) -> eyre::Result<Self> {
        let postgres_future = async {
            let Some(database) = config.database.clone() else {
                info!("DATABASE_URL not set, users are kept in memory");
                return Ok(None);
            };
            let db = postgres::connect_with_retry(database, None)
                .await
                .map_err(|e| eyre!("PostgreSQL connection failed: {e}"))?;
            postgres::run_migrations::<Migrator>(&db, config.app.name)
                .await
                .map_err(|e| eyre!("Migrations failed: {e}"))?;
            Ok::<_, eyre::Report>(Some(db))
        };

        let redis_future = async {
            match &config.redis {
                Some(redis) => redis_store::connect_with_retry(redis, None)
                    .await
                    .map(Some)
                    .map_err(|e| eyre!("Redis connection failed: {e}")),
                None => Ok(None),
            }
        };

        let (db, redis) = tokio::try_join!(postgres_future, redis_future)?;
        Ok(Self { db, redis })
    }

    /// Redis first, then PostgreSQL, then memory
    pub fn token_store(&self) -> Arc<dyn TokenStore> {
        match (&self.redis, &self.db) {
            (Some(redis), _) => {
                info!("Token store: redis");
                Arc::new(RedisTokenStore::new(redis.clone()))
            }
            (None, Some(db)) => {
                info!("Token store: postgres");
                Arc::new(PgTokenStore::new(db.clone()))
            }
            (None, None) => {
                info!("Token store: in-memory");
                Arc::new(InMemoryTokenStore::new())
            }
        }
    }
}
