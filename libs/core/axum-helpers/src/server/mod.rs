//! Router assembly, probes and graceful shutdown.
//!
//! ```ignore
//! let router = create_router::<ApiDoc>(api_routes, root_routes, cors);
//! create_production_app(router, &server_config, cleanup).await?;
//! ```

pub mod app;
pub mod cleanup;
pub mod health;
pub mod shutdown;

pub use app::{create_production_app, create_router};
pub use cleanup::{CleanupCoordinator, close_postgres};
pub use health::{HealthCheckFuture, HealthResponse, health_router, run_health_checks};
pub use shutdown::{ShutdownCoordinator, shutdown_signal};
