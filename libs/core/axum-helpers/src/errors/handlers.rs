use super::AppError;
use axum::response::{IntoResponse, Response};

/// Router fallback producing the JSON 404 envelope.
pub async fn not_found() -> Response {
    AppError::NotFound("The requested resource was not found.".to_string()).into_response()
}
