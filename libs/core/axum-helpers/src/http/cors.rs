use axum::http::{HeaderValue, Method, header};
use core_config::{ConfigError, Environment, env_optional};
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// CORS policy from `CORS_ALLOWED_ORIGIN` (comma-separated origins).
///
/// Without the variable, development allows any origin and production allows
/// none.
pub fn cors_layer(environment: &Environment) -> Result<CorsLayer, ConfigError> {
    let Some(raw) = env_optional("CORS_ALLOWED_ORIGIN") else {
        if environment.is_development() {
            tracing::warn!("CORS_ALLOWED_ORIGIN not set, allowing any origin");
            return Ok(CorsLayer::permissive());
        }
        return Ok(CorsLayer::new());
    };

    let origins = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(HeaderValue::from_str)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ConfigError::ParseError {
            key: "CORS_ALLOWED_ORIGIN".to_string(),
            details: e.to_string(),
        })?;

    tracing::info!(origins = %raw, "CORS configured");

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .max_age(Duration::from_secs(3600)))
}
