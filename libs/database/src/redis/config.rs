#[cfg(feature = "config")]
use core_config::{ConfigError, FromEnv, env_required};

#[derive(Clone, Debug)]
pub struct RedisConfig {
    pub url: String,
}

impl RedisConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// - `REDIS_URL` (required)
#[cfg(feature = "config")]
impl FromEnv for RedisConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(env_required("REDIS_URL")?))
    }
}

#[cfg(all(test, feature = "config"))]
mod tests {
    use super::*;

    #[test]
    fn test_from_env() {
        temp_env::with_var("REDIS_URL", Some("redis://127.0.0.1:6379"), || {
            assert_eq!(RedisConfig::from_env().unwrap().url, "redis://127.0.0.1:6379");
        });
        temp_env::with_var_unset("REDIS_URL", || {
            assert!(RedisConfig::from_env().is_err());
        });
    }
}
