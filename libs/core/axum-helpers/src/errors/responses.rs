//! Reusable OpenAPI responses for the error envelope.

use super::ErrorResponse;
use serde_json::json;
use utoipa::ToResponse;

#[derive(ToResponse)]
#[response(
    description = "Missing, invalid or revoked credentials",
    content_type = "application/json",
    example = json!({
        "success": false,
        "message": "Unauthenticated.",
        "slug": "unauthorized",
        "data": null
    })
)]
pub struct UnauthorizedResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "No active record matches",
    content_type = "application/json",
    example = json!({
        "success": false,
        "message": "Record not found.",
        "slug": "not_found",
        "data": null
    })
)]
pub struct NotFoundResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Validation failed",
    content_type = "application/json",
    example = json!({
        "success": false,
        "message": "The username has already been taken.",
        "slug": "validation_error",
        "data": { "username": ["The username has already been taken."] }
    })
)]
pub struct ValidationErrorResponse(pub ErrorResponse);

#[derive(ToResponse)]
#[response(
    description = "Internal or upstream parsing failure",
    content_type = "application/json",
    example = json!({
        "success": false,
        "message": "An unexpected error occurred.",
        "slug": "internal_error",
        "data": null
    })
)]
pub struct InternalServerErrorResponse(pub ErrorResponse);
