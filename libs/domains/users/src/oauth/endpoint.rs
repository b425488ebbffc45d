use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Form, Json, Router};

use super::error::{OAuthError, OAuthErrorBody};
use super::server::{TokenRequest, TokenServer};
use crate::models::TokenResponse;
use crate::repository::UserRepository;

pub const TOKEN_PATH: &str = "/oauth/token";

/// Router serving `POST /oauth/token`
pub fn router<R: UserRepository + 'static>(server: TokenServer<R>) -> Router {
    Router::new()
        .route(TOKEN_PATH, post(issue_token::<R>))
        .with_state(server)
}

/// Issue an access/refresh token pair
#[utoipa::path(
    post,
    path = "/oauth/token",
    tag = "oauth",
    request_body(content = TokenRequest, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Token pair issued", body = TokenResponse),
        (status = 400, description = "Invalid request or grant", body = OAuthErrorBody),
        (status = 401, description = "Client authentication failed", body = OAuthErrorBody),
    )
)]
pub async fn issue_token<R: UserRepository + 'static>(
    State(server): State<TokenServer<R>>,
    form: Result<Form<TokenRequest>, FormRejection>,
) -> Result<Json<TokenResponse>, OAuthError> {
    let Form(request) = form.map_err(|e| {
        tracing::debug!(error = %e, "Unreadable token request");
        OAuthError::UnsupportedGrantType
    })?;

    server.issue(request).await.map(Json)
}
