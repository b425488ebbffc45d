pub mod codes;
pub mod handlers;
pub mod responses;

pub use codes::ErrorCode;

use crate::response::ApiResponse;
use axum::{
    extract::rejection::JsonRejection,
    response::{IntoResponse, Response},
};
use sea_orm::DbErr;
use serde_json::{Map, Value, json};
use thiserror::Error;
use validator::ValidationErrors;

/// Envelope shape of every error response, for OpenAPI docs
pub type ErrorResponse = ApiResponse<Value>;

/// Application error rendered as an envelope with `success: false`.
///
/// Domain crates convert their own error enums into this type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    /// `details` maps field names to lists of messages
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        details: Option<Value>,
    },

    #[error("Parsing error: {0}")]
    Parsing(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            details: None,
        }
    }

    /// Validation failure on a single field, shaped like the extractor's output
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::Validation {
            details: Some(json!({ field: [message.clone()] })),
            message,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Unauthorized(_) => ErrorCode::Unauthorized,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::Validation { .. } => ErrorCode::Validation,
            Self::Parsing(_) => ErrorCode::Parsing,
            Self::Internal(_) | Self::Database(_) => ErrorCode::Internal,
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        let details = field_messages(&errors);
        let message = first_message(&details)
            .unwrap_or_else(|| ErrorCode::Validation.default_message().to_string());
        Self::Validation {
            message,
            details: Some(Value::Object(details)),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation {
            message: ErrorCode::Validation.default_message().to_string(),
            details: Some(json!({ "body": [rejection.body_text()] })),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();

        let (message, data) = match self {
            Self::Unauthorized(msg) | Self::NotFound(msg) => (msg, None),
            Self::Validation { message, details } => (message, details),
            Self::Parsing(detail) | Self::Internal(detail) => {
                tracing::error!(error_code = code.code(), %detail, "{}", code.default_message());
                (code.default_message().to_string(), None)
            }
            Self::Database(e) => {
                tracing::error!(error_code = code.code(), error = ?e, "Database error");
                (code.default_message().to_string(), None)
            }
        };

        if !code.is_server_error() {
            tracing::info!(error_code = code.code(), slug = code.slug(), %message, "Request rejected");
        }

        ApiResponse::failure(code.status(), message, data)
            .with_slug(code.slug())
            .into_response()
    }
}

/// `{ "field": ["message", ...] }` from validator output
fn field_messages(errors: &ValidationErrors) -> Map<String, Value> {
    errors
        .field_errors()
        .iter()
        .map(|(field, errs)| {
            let messages: Vec<Value> = errs
                .iter()
                .map(|err| match &err.message {
                    Some(msg) => Value::String(msg.to_string()),
                    None => Value::String(format!("The {field} field is invalid ({}).", err.code)),
                })
                .collect();
            (field.to_string(), Value::Array(messages))
        })
        .collect()
}

fn first_message(details: &Map<String, Value>) -> Option<String> {
    let mut fields: Vec<_> = details.keys().collect();
    fields.sort();
    fields
        .first()
        .and_then(|f| details[*f].get(0))
        .and_then(Value::as_str)
        .map(str::to_string)
}
