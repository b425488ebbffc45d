//! Users Domain
//!
//! User directory plus password-grant authentication.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐      ┌──────────────┐
//! │   Handlers   │ ───► │ AuthService  │ ─► TokenExchange ─► POST /oauth/token
//! └──────┬───────┘      └──────────────┘                          │
//!        │                                                        ▼
//! ┌──────▼───────┐                                        ┌──────────────┐
//! │ UserService  │                                        │ TokenServer  │
//! └──────┬───────┘                                        └──────┬───────┘
//!        │                                                       │
//! ┌──────▼───────┐                                        ┌──────▼───────┐
//! │  Repository  │  ◄──────────────────────────────────── │  TokenStore  │
//! └──────────────┘                                        └──────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use axum_helpers::{JwtCodec, JwtConfig};
//! use domain_users::{
//!     AuthService, CredentialBuilder, InMemoryTokenStore, InMemoryUserRepository,
//!     InProcessTokenExchange, OAuthClientConfig, TokenLifetimes, TokenServer, TracingNotifier,
//!     UserService, UsersState, handlers, token_router,
//! };
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let repo = Arc::new(InMemoryUserRepository::new());
//! let store = Arc::new(InMemoryTokenStore::new());
//! let client = OAuthClientConfig::new("client-id", "client-secret");
//! let codec = JwtCodec::new(&JwtConfig::new("a-signing-key-of-at-least-32-chars")?);
//!
//! let tokens = TokenServer::new(repo.clone(), store.clone(), codec, client.clone(), TokenLifetimes::default());
//! let exchange = Arc::new(InProcessTokenExchange::new(token_router(tokens.clone())));
//!
//! let state = UsersState {
//!     users: UserService::new(repo.clone()),
//!     auth: AuthService::new(repo, CredentialBuilder::new(client), exchange, store),
//!     notifier: Arc::new(TracingNotifier),
//! };
//! let router = handlers::router(state, tokens);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod entity;
pub mod error;
pub mod events;
pub mod handlers;
pub mod models;
pub mod oauth;
pub mod password;
pub mod postgres;
pub mod repository;
pub mod service;

// Re-export commonly used types
pub use auth::AuthService;
pub use error::{UserError, UserResult};
pub use events::{BroadcastNotifier, NotificationSink, TracingNotifier, UserEvent};
pub use handlers::{ApiDoc, UsersState};
pub use models::{
    AuthenticatedUser, CreateUser, LoginRequest, LoginResponse, RefreshTokenRequest,
    TokenResponse, UpdateUser, User, UserFilter, UserListing, UserResponse,
};
pub use oauth::{
    CredentialBuilder, Credentials, HttpTokenExchange, InMemoryTokenStore, InProcessTokenExchange,
    OAuthClientConfig, OAuthError, PgTokenStore, RedisTokenStore, TokenEndpointConfig,
    TokenExchange, TokenLifetimes, TokenServer, TokenStore, token_router,
};
pub use postgres::PgUserRepository;
pub use repository::{InMemoryUserRepository, UserRepository};
pub use service::UserService;
