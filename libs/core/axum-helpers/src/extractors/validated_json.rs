use crate::errors::AppError;
use axum::extract::{FromRequest, Json, Request};
use serde::de::DeserializeOwned;
use validator::Validate;

/// JSON body deserialized and checked with `validator`.
///
/// Malformed bodies and rule violations both reject with a 422 envelope whose
/// `data` maps each failing field to its messages.
///
/// ```ignore
/// async fn create(ValidatedJson(input): ValidatedJson<CreateUser>) -> impl IntoResponse { .. }
/// ```
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = Json::<T>::from_request(req, state).await?;
        data.validate()?;
        Ok(ValidatedJson(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::Body,
        http::{Request as HttpRequest, StatusCode, header},
        routing::post,
    };
    use http_body_util::BodyExt;
    use serde::Deserialize;
    use serde_json::Value;
    use tower::ServiceExt;

    #[derive(Deserialize, Validate)]
    struct Login {
        #[validate(length(min = 1, message = "The username field is required."))]
        username: String,
    }

    async fn handler(ValidatedJson(input): ValidatedJson<Login>) -> String {
        input.username
    }

    async fn send(body: &str) -> (StatusCode, Vec<u8>) {
        let app = Router::new().route("/", post(handler));
        let response = app
            .oneshot(
                HttpRequest::post("/")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn test_valid_body_passes() {
        let (status, body) = send(r#"{"username":"jdoe"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"jdoe");
    }

    #[tokio::test]
    async fn test_rule_violation_is_422_envelope() {
        let (status, body) = send(r#"{"username":""}"#).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["slug"], "validation_error");
        assert_eq!(json["data"]["username"][0], "The username field is required.");
    }

    #[tokio::test]
    async fn test_missing_field_is_422_envelope() {
        let (status, body) = send("{}").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
        assert!(json["data"]["body"][0].as_str().unwrap().contains("username"));
    }
}
