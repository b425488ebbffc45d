use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::error::UserError;

/// Canonical `invalid_grant` description for bad resource-owner credentials
pub const INVALID_GRANT_MESSAGE: &str = "The provided authorization grant (e.g., authorization code, resource owner credentials) or refresh token is invalid, expired, revoked, does not match the redirection URI used in the authorization request, or was issued to another client.";

const INVALID_REQUEST_MESSAGE: &str = "The request is missing a required parameter, includes an invalid parameter value, includes a parameter more than once, or is otherwise malformed.";

const UNSUPPORTED_GRANT_MESSAGE: &str =
    "The authorization grant type is not supported by the authorization server.";

/// Token endpoint failures, rendered in the OAuth2 error format
#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("Client authentication failed")]
    InvalidClient,

    #[error("{}", INVALID_REQUEST_MESSAGE)]
    InvalidRequest { parameter: &'static str },

    #[error("{}", UNSUPPORTED_GRANT_MESSAGE)]
    UnsupportedGrantType,

    #[error("{message}")]
    InvalidGrant {
        message: String,
        hint: Option<String>,
    },

    #[error("The authorization server encountered an unexpected condition which prevented it from fulfilling the request.")]
    ServerError(#[source] UserError),
}

/// OAuth2 error body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OAuthErrorBody {
    pub error: String,
    pub error_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    pub message: String,
}

impl OAuthError {
    pub fn invalid_credentials() -> Self {
        Self::InvalidGrant {
            message: INVALID_GRANT_MESSAGE.to_string(),
            hint: None,
        }
    }

    pub fn invalid_refresh_token(hint: impl Into<String>) -> Self {
        Self::InvalidGrant {
            message: "The refresh token is invalid.".to_string(),
            hint: Some(hint.into()),
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            Self::InvalidClient => "invalid_client",
            Self::InvalidRequest { .. } => "invalid_request",
            Self::UnsupportedGrantType => "unsupported_grant_type",
            Self::InvalidGrant { .. } => "invalid_grant",
            Self::ServerError(_) => "server_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidClient => StatusCode::UNAUTHORIZED,
            Self::ServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn hint(&self) -> Option<String> {
        match self {
            Self::InvalidRequest { parameter } => Some(format!("Check the `{parameter}` parameter")),
            Self::InvalidGrant { hint, .. } => hint.clone(),
            _ => None,
        }
    }

    pub fn body(&self) -> OAuthErrorBody {
        let description = self.to_string();
        OAuthErrorBody {
            error: self.error_type().to_string(),
            error_description: description.clone(),
            hint: self.hint(),
            message: description,
        }
    }
}

impl From<UserError> for OAuthError {
    fn from(err: UserError) -> Self {
        Self::ServerError(err)
    }
}

impl From<sea_orm::DbErr> for OAuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::ServerError(UserError::Database(err))
    }
}

impl IntoResponse for OAuthError {
    fn into_response(self) -> Response {
        match &self {
            Self::ServerError(source) => {
                tracing::error!(error = %source, "Token endpoint failure");
            }
            other => {
                tracing::info!(error = other.error_type(), "Token request rejected");
            }
        }
        (self.status(), Json(self.body())).into_response()
    }
}
