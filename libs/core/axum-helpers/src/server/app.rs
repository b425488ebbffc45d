use super::shutdown::ShutdownCoordinator;
use crate::errors::handlers::not_found;
use crate::http::security::security_headers;
use axum::{Router, middleware};
use core_config::server::ServerConfig;
use std::future::Future;
use std::io;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info, warn};
use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;
use utoipa_redoc::{Redoc, Servable as RedocServable};
use utoipa_scalar::{Scalar, Servable as ScalarServable};
use utoipa_swagger_ui::SwaggerUi;

/// Combine the application routes with docs and cross-cutting layers.
///
/// - `apis` is nested under `/api`
/// - `root` is merged at the top level (token endpoint, probes)
/// - OpenAPI JSON at `/api-docs/openapi.json`, with Swagger UI, ReDoc,
///   RapiDoc and Scalar viewers
/// - tracing, security headers, CORS, compression, JSON 404 fallback
pub fn create_router<T>(apis: Router, root: Router, cors: CorsLayer) -> Router
where
    T: OpenApi + 'static,
{
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", T::openapi()))
        .merge(Redoc::with_url("/redoc", T::openapi()))
        .merge(RapiDoc::new("/api-docs/openapi.json").path("/rapidoc"))
        .merge(Scalar::with_url("/scalar", T::openapi()))
        .nest("/api", apis)
        .merge(root)
        .fallback(not_found)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(middleware::from_fn(security_headers))
        .layer(cors)
        .layer(CompressionLayer::new())
}

/// Serve until SIGINT/SIGTERM, then run `cleanup` bounded by the configured
/// shutdown timeout.
pub async fn create_production_app<F>(
    router: Router,
    server_config: &ServerConfig,
    cleanup: F,
) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let coordinator = ShutdownCoordinator::new();
    let timeout = server_config.shutdown_timeout;

    let listener = tokio::net::TcpListener::bind(server_config.address()).await?;
    info!("Server listening on {}", listener.local_addr()?);

    let signal_source = coordinator.clone();
    tokio::spawn(async move { signal_source.wait_for_signal().await });

    let mut on_shutdown = coordinator.subscribe();
    let cleanup_handle = tokio::spawn(async move {
        let _ = on_shutdown.recv().await;
        info!(?timeout, "Running cleanup");
        match tokio::time::timeout(timeout, cleanup).await {
            Ok(()) => info!("Cleanup completed"),
            Err(_) => warn!(?timeout, "Cleanup exceeded timeout, forcing shutdown"),
        }
    });

    let served = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(coordinator.clone().stopped())
        .await
        .inspect_err(|e| tracing::error!(error = ?e, "Server error"));

    coordinator.shutdown();
    cleanup_handle.await.ok();

    served
}
