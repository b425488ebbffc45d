//! # Axum Helpers
//!
//! Shared HTTP plumbing for the service binaries.
//!
//! - **[`response`]**: the `{success, message, slug, data}` envelope
//! - **[`errors`]**: [`AppError`] rendered through the envelope, with error codes
//! - **[`extractors`]**: [`ValidatedJson`]
//! - **[`auth`]**: HS256 codec and the bearer-token middleware
//! - **[`http`]**: CORS and security headers
//! - **[`server`]**: router assembly, health probes, graceful shutdown

pub mod auth;
pub mod errors;
pub mod extractors;
pub mod http;
pub mod response;
pub mod server;

pub use auth::{Authenticator, JwtCodec, JwtConfig, JwtError, bearer_token, require_bearer};
pub use errors::{AppError, ErrorCode, ErrorResponse};
pub use extractors::ValidatedJson;
pub use http::{cors_layer, security_headers};
pub use response::ApiResponse;
pub use server::{
    CleanupCoordinator, HealthCheckFuture, HealthResponse, ShutdownCoordinator, close_postgres,
    create_production_app, create_router, health_router, run_health_checks, shutdown_signal,
};
