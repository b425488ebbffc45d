//! Redis through `ConnectionManager`

mod config;
mod connector;

pub use config::RedisConfig;
pub use connector::{check_health, connect, connect_with_retry};
pub use redis::aio::ConnectionManager;
