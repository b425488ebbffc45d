use axum::Router;
use axum_helpers::server::{
    CleanupCoordinator, close_postgres, create_production_app, create_router, health_router,
};
use axum_helpers::{JwtCodec, cors_layer};
use core_config::tracing::{init_tracing, install_color_eyre};
use domain_users::{
    AuthService, CredentialBuilder, HttpTokenExchange, InMemoryUserRepository,
    InProcessTokenExchange, PgUserRepository, TokenExchange, TokenServer, TokenStore,
    TracingNotifier, UserRepository, UserService, UsersState, handlers, token_router,
};
use std::sync::Arc;
use tracing::info;

mod config;
mod health;
mod openapi;
mod state;

use config::Config;
use state::Backends;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Install color-eyre first for colored error output (before any fallible operations)
    install_color_eyre();

    let config = Config::from_env()?;

    init_tracing(&config.environment);

    let backends = Backends::connect(&config).await?;
    let store = backends.token_store();

    let app = match backends.db.clone() {
        Some(db) => build_app(Arc::new(PgUserRepository::new(db)), store, &config, &backends)?,
        None => build_app(Arc::new(InMemoryUserRepository::new()), store, &config, &backends)?,
    };

    info!(
        timeout = ?config.server.shutdown_timeout,
        "Starting users API with graceful shutdown"
    );

    let mut cleanup = CleanupCoordinator::new();
    if let Some(db) = backends.db {
        cleanup.add_task("postgres", close_postgres(db));
    }
    if let Some(redis) = backends.redis {
        // ConnectionManager closes on drop
        cleanup.add_task("redis", async move { drop(redis) });
    }

    create_production_app(app, &config.server, cleanup.run())
        .await
        .map_err(|e| eyre::eyre!("Server error: {e}"))?;

    info!("Users API shutdown complete");
    Ok(())
}

/// Wire the token server, the exchange and the user routes over one repository.
fn build_app<R: UserRepository + 'static>(
    users: Arc<R>,
    store: Arc<dyn TokenStore>,
    config: &Config,
    backends: &Backends,
) -> eyre::Result<Router> {
    let tokens = TokenServer::new(
        users.clone(),
        store.clone(),
        JwtCodec::new(&config.jwt),
        config.client.clone(),
        config.lifetimes,
    );
    let token_routes = token_router(tokens.clone());

    let exchange: Arc<dyn TokenExchange> = match &config.token_endpoint.url {
        Some(url) => {
            info!(%url, "Exchanging credentials with external token endpoint");
            Arc::new(HttpTokenExchange::new(url.clone(), config.token_endpoint.timeout)?)
        }
        None => Arc::new(InProcessTokenExchange::new(token_routes.clone())),
    };

    let state = UsersState {
        users: UserService::new(users.clone()),
        auth: AuthService::new(
            users,
            CredentialBuilder::new(config.client.clone()),
            exchange,
            store,
        ),
        notifier: Arc::new(TracingNotifier),
    };

    let root = token_routes
        .merge(health_router(config.app))
        .merge(health::ready_router(backends.clone()));

    Ok(create_router::<openapi::ApiDoc>(
        handlers::router(state, tokens),
        root,
        cors_layer(&config.environment)?,
    ))
}
