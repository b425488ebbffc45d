use crate::errors::AppError;
use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Resolves a bearer token into the caller's identity.
#[async_trait]
pub trait Authenticator: Clone + Send + Sync + 'static {
    type Identity: Clone + Send + Sync + 'static;

    async fn authenticate(&self, token: &str) -> Result<Self::Identity, AppError>;
}

/// Token from `Authorization: Bearer <token>`; the scheme is case-insensitive.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Rejects the request with a 401 envelope unless it carries a valid bearer
/// token. On success the identity is inserted into request extensions.
///
/// ```ignore
/// let protected = Router::new()
///     .route("/user/get/self", get(get_self))
///     .layer(axum::middleware::from_fn_with_state(guard, require_bearer::<Guard>));
/// ```
pub async fn require_bearer<A: Authenticator>(
    State(auth): State<A>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(request.headers()) else {
        tracing::debug!("No bearer token on protected route");
        return AppError::Unauthorized("Unauthenticated.".to_string()).into_response();
    };

    match auth.authenticate(token).await {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Extension, Router, body::Body, http::StatusCode, routing::get};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[derive(Clone)]
    struct StaticAuth;

    #[async_trait]
    impl Authenticator for StaticAuth {
        type Identity = String;

        async fn authenticate(&self, token: &str) -> Result<String, AppError> {
            if token == "good" {
                Ok("alice".to_string())
            } else {
                Err(AppError::Unauthorized("Unauthenticated.".to_string()))
            }
        }
    }

    fn app() -> Router {
        Router::new()
            .route("/me", get(|Extension(name): Extension<String>| async move { name }))
            .layer(axum::middleware::from_fn_with_state(StaticAuth, require_bearer::<StaticAuth>))
    }

    async fn call(auth: Option<&str>) -> (StatusCode, String) {
        let mut builder = axum::http::Request::get("/me");
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        let response = app().oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, "bearer abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc"));

        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, "Bearer ".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }

    #[tokio::test]
    async fn test_valid_token_reaches_handler() {
        let (status, body) = call(Some("Bearer good")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "alice");
    }

    #[tokio::test]
    async fn test_missing_token_is_401_envelope() {
        let (status, body) = call(None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("\"message\":\"Unauthenticated.\""));
    }

    #[tokio::test]
    async fn test_rejected_token_is_401() {
        let (status, _) = call(Some("Bearer bad")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
