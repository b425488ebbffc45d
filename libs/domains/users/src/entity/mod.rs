pub mod access_token;
pub mod refresh_token;
pub mod user;
