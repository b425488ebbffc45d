use axum_helpers::JwtConfig;
use core_config::{AppInfo, FromEnv, app_info, env_optional, server::ServerConfig};
use database::postgres::PostgresConfig;
use database::redis::RedisConfig;
use domain_users::{OAuthClientConfig, TokenEndpointConfig, TokenLifetimes};

pub use core_config::Environment;

/// Application configuration composed from the shared config components
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub environment: Environment,
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    pub client: OAuthClientConfig,
    pub lifetimes: TokenLifetimes,
    pub token_endpoint: TokenEndpointConfig,
    /// In-memory user repository when `DATABASE_URL` is unset
    pub database: Option<PostgresConfig>,
    /// Token store in Redis when `REDIS_URL` is set
    pub redis: Option<RedisConfig>,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let server = ServerConfig::from_env()?; // HOST=0.0.0.0, PORT=8080
        let jwt = JwtConfig::from_env()?; // Required
        let client = OAuthClientConfig::from_env()?; // Required
        let lifetimes = TokenLifetimes::from_env()?;
        let token_endpoint = TokenEndpointConfig::from_env()?;

        let database = env_optional("DATABASE_URL")
            .map(|_| PostgresConfig::from_env())
            .transpose()?;
        let redis = env_optional("REDIS_URL").map(RedisConfig::new);

        Ok(Self {
            app: app_info!(),
            environment,
            server,
            jwt,
            client,
            lifetimes,
            token_endpoint,
            database,
            redis,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "config-test-secret-config-test-secret";

    #[test]
    fn test_minimal_environment_uses_in_memory_backends() {
        temp_env::with_vars(
            [
                ("JWT_SECRET", Some(SECRET)),
                ("PGC_ID", Some("client")),
                ("PGC_SECRET", Some("secret")),
                ("DATABASE_URL", None),
                ("REDIS_URL", None),
                ("TOKEN_ENDPOINT_URL", None),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.app.name, "users_api");
                assert!(config.database.is_none());
                assert!(config.redis.is_none());
                assert!(config.token_endpoint.url.is_none());
            },
        );
    }

    #[test]
    fn test_backends_selected_from_urls() {
        temp_env::with_vars(
            [
                ("JWT_SECRET", Some(SECRET)),
                ("PGC_ID", Some("client")),
                ("PGC_SECRET", Some("secret")),
                ("DATABASE_URL", Some("postgres://localhost/users")),
                ("REDIS_URL", Some("redis://127.0.0.1:6379")),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.database.unwrap().url, "postgres://localhost/users");
                assert_eq!(config.redis.unwrap().url, "redis://127.0.0.1:6379");
            },
        );
    }

    #[test]
    fn test_missing_client_is_an_error() {
        temp_env::with_vars(
            [
                ("JWT_SECRET", Some(SECRET)),
                ("PGC_ID", None),
                ("PGC_SECRET", None),
            ],
            || {
                let err = Config::from_env().unwrap_err();
                assert!(err.to_string().contains("PGC_ID"));
            },
        );
    }
}
