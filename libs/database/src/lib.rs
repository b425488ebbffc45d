//! Connection management for the service's backing stores.
//!
//! # Features
//!
//! - `postgres` (default) - PostgreSQL through SeaORM, plus migration running
//! - `redis` (default) - Redis `ConnectionManager`
//! - `config` (default) - `core_config::FromEnv` implementations for the configs
//!
//! ```ignore
//! use database::postgres::{self, PostgresConfig};
//! use migration::Migrator;
//!
//! let db = postgres::connect_with_retry(PostgresConfig::new(url), None).await?;
//! postgres::run_migrations::<Migrator>(&db, "users_api").await?;
//! ```

pub mod common;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "redis")]
pub mod redis;

pub use common::{DatabaseError, DatabaseResult, RetryConfig};
