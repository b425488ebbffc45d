//! Machine-readable error classes.
//!
//! Each class carries the `slug` sent to clients in the envelope, an integer
//! code for structured logs, and a default message.
//!
//! ```rust
//! use axum_helpers::errors::ErrorCode;
//!
//! assert_eq!(ErrorCode::Validation.slug(), "validation_error");
//! assert_eq!(ErrorCode::Validation.code(), 1003);
//! ```

use axum::http::StatusCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Missing, invalid, expired or revoked credentials
    Unauthorized,
    /// No active record matches the request
    NotFound,
    /// Request data failed syntactic or uniqueness rules
    Validation,
    /// An upstream reply could not be decoded
    Parsing,
    /// Storage, transport or hashing failure
    Internal,
}

impl ErrorCode {
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::Validation => "validation_error",
            Self::Parsing => "parsing_error",
            Self::Internal => "internal_error",
        }
    }

    /// Integer code used in logs.
    ///
    /// - 1000-1999: client errors
    /// - 5000-5999: server errors
    pub fn code(&self) -> i32 {
        match self {
            Self::Unauthorized => 1001,
            Self::NotFound => 1002,
            Self::Validation => 1003,
            Self::Parsing => 5001,
            Self::Internal => 5002,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Parsing | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            Self::Unauthorized => "Unauthenticated.",
            Self::NotFound => "Record not found.",
            Self::Validation => "The given data was invalid.",
            Self::Parsing => "Unable to parse the upstream response.",
            Self::Internal => "An unexpected error occurred.",
        }
    }

    pub fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}
