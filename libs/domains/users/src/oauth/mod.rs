//! Password-grant OAuth2: credential assembly, the token exchange client,
//! and the token server that issues and validates bearer tokens.

pub mod credentials;
pub mod endpoint;
pub mod error;
pub mod exchange;
pub mod pg_store;
pub mod redis_store;
pub mod server;
pub mod store;

pub use credentials::{CredentialBuilder, Credentials, GrantType, OAuthClientConfig};
pub use endpoint::{TOKEN_PATH, router as token_router};
pub use error::OAuthError;
pub use exchange::{
    HttpTokenExchange, InProcessTokenExchange, TokenEndpointConfig, TokenExchange,
    interpret_token_response,
};
pub use pg_store::PgTokenStore;
pub use redis_store::RedisTokenStore;
pub use server::{TokenLifetimes, TokenRequest, TokenServer};
pub use store::{AccessTokenRecord, InMemoryTokenStore, RefreshTokenRecord, TokenStore};
