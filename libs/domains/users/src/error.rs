use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use thiserror::Error;

/// Message returned for every failed login, whether the account is unknown
/// or the password is wrong.
pub const INCORRECT_CREDENTIALS: &str = "Incorrect username or password";

#[derive(Debug, Error)]
pub enum UserError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("User '{0}' not found")]
    NotFound(String),

    /// A field failed a business rule such as uniqueness
    #[error("{message}")]
    Validation { field: &'static str, message: String },

    /// Token endpoint reply could not be decoded
    #[error("Unable to parse token response: {0}")]
    Parsing(String),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type UserResult<T> = Result<T, UserError>;

impl UserError {
    pub fn taken(field: &'static str) -> Self {
        Self::Validation {
            field,
            message: format!("The {field} has already been taken."),
        }
    }

    pub fn incorrect_credentials() -> Self {
        Self::Unauthorized(INCORRECT_CREDENTIALS.to_string())
    }
}

impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::Unauthorized(msg) => AppError::Unauthorized(msg),
            UserError::NotFound(_) => AppError::NotFound("Record not found.".to_string()),
            UserError::Validation { field, message } => AppError::field(field, message),
            UserError::Parsing(msg) => AppError::Parsing(msg),
            UserError::Database(e) => AppError::Database(e),
            UserError::PasswordHash(msg) | UserError::Internal(msg) => AppError::Internal(msg),
            UserError::Redis(e) => AppError::Internal(format!("Redis error: {e}")),
        }
    }
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_status_codes() {
        let cases = [
            (UserError::incorrect_credentials(), StatusCode::UNAUTHORIZED),
            (UserError::NotFound("jdoe".into()), StatusCode::NOT_FOUND),
            (UserError::taken("email"), StatusCode::UNPROCESSABLE_ENTITY),
            (UserError::Parsing("eof".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (UserError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_taken_message() {
        assert_eq!(
            UserError::taken("username").to_string(),
            "The username has already been taken."
        );
    }
}
