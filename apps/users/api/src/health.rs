//! Readiness probe over whichever stores are configured.

use crate::state::Backends;
use axum::{Router, extract::State, response::IntoResponse, routing::get};
use axum_helpers::server::{HealthCheckFuture, run_health_checks};
use database::{postgres, redis};

pub fn ready_router(backends: Backends) -> Router {
    Router::new()
        .route("/ready", get(ready_handler))
        .with_state(backends)
}

async fn ready_handler(State(backends): State<Backends>) -> impl IntoResponse {
    let mut checks: Vec<(&str, HealthCheckFuture<'_>)> = Vec::new();

    if let Some(db) = &backends.db {
        checks.push((
            "database",
            Box::pin(async move { postgres::check_health(db).await.map_err(|e| e.to_string()) }),
        ));
    }
    if let Some(manager) = &backends.redis {
        checks.push((
            "redis",
            Box::pin(async move { redis::check_health(manager).await.map_err(|e| e.to_string()) }),
        ));
    }

    run_health_checks(checks).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_ready_without_external_stores() {
        let response = ready_router(Backends::default())
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ready");
    }
}
