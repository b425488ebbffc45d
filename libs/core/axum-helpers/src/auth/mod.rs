//! Bearer-token plumbing shared by protected routes.
//!
//! - [`JwtConfig`] / [`JwtCodec`]: HS256 signing key and claim encoding
//! - [`Authenticator`] / [`require_bearer`]: middleware that resolves the
//!   caller's identity and stores it in request extensions

pub mod config;
pub mod jwt;
pub mod middleware;

pub use config::JwtConfig;
pub use jwt::{JwtCodec, JwtError};
pub use middleware::{Authenticator, bearer_token, require_bearer};
