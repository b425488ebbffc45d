use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr, Statement};
use sea_orm_migration::MigratorTrait;
use tracing::{debug, info};

use super::PostgresConfig;
use crate::common::{DatabaseError, RetryConfig, retry_with_backoff};

pub async fn connect(config: PostgresConfig) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(config.into_connect_options()).await?;
    info!("Connected to PostgreSQL");
    Ok(db)
}

/// Connect, retrying with exponential backoff while the database comes up.
pub async fn connect_with_retry(
    config: PostgresConfig,
    retry: Option<RetryConfig>,
) -> Result<DatabaseConnection, DbErr> {
    let retry = retry.unwrap_or_default();
    retry_with_backoff("postgres", &retry, || connect(config.clone())).await
}

/// Apply every pending migration of `M`.
pub async fn run_migrations<M: MigratorTrait>(
    db: &DatabaseConnection,
    app_name: &str,
) -> Result<(), DbErr> {
    info!(app = app_name, "Running database migrations");
    M::up(db, None).await?;
    info!(app = app_name, "Migrations complete");
    Ok(())
}

/// `SELECT 1` round trip, used by the readiness probe.
pub async fn check_health(db: &DatabaseConnection) -> Result<(), DatabaseError> {
    let stmt = Statement::from_string(DatabaseBackend::Postgres, "SELECT 1".to_owned());
    db.query_one_raw(stmt)
        .await
        .map_err(|e| DatabaseError::unhealthy("postgres", e))?;
    debug!("PostgreSQL health check passed");
    Ok(())
}
