//! Uniform response envelope.
//!
//! Every JSON response the service produces, successful or not, has the shape
//!
//! ```json
//! { "success": true, "message": "Successfully fetched record.", "slug": null, "data": { } }
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    /// Short machine-readable tag such as `login_success` or `not_found`
    pub slug: Option<String>,
    pub data: Option<T>,
    #[serde(skip)]
    status: StatusCode,
}

impl<T> ApiResponse<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            slug: None,
            data: Some(data),
            status: StatusCode::OK,
        }
    }

    pub fn failure(status: StatusCode, message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            success: false,
            message: message.into(),
            slug: None,
            data,
            status,
        }
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_success_envelope() {
        let response = ApiResponse::success("Successfully fetched record.", json!({"id": 1}))
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({
                "success": true,
                "message": "Successfully fetched record.",
                "slug": null,
                "data": {"id": 1}
            })
        );
    }

    #[tokio::test]
    async fn test_slug_and_status() {
        let response = ApiResponse::success("Successfully logged in", json!([]))
            .with_slug("login_success")
            .with_status(StatusCode::CREATED)
            .into_response();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["slug"], "login_success");
    }

    #[tokio::test]
    async fn test_failure_without_data() {
        let response =
            ApiResponse::<Value>::failure(StatusCode::NOT_FOUND, "Record not found.", None)
                .with_slug("not_found")
                .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["data"], Value::Null);
    }
}
