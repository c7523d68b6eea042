//! Webhook transport.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use beacon_common::{AppError, get_metrics};
use beacon_core::BotService;
use beacon_core::telegram::Update;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::debug;

/// Header carrying the secret registered with `setWebhook`.
const SECRET_HEADER: &str = "x-telegram-bot-api-secret-token";

#[derive(Clone)]
struct WebhookState {
    service: BotService,
    secret: Option<String>,
}

/// Build the webhook router.
pub fn router(service: BotService, secret: Option<String>) -> Router {
    Router::new()
        .route("/telegram/webhook", post(receive_update))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(WebhookState { service, secret })
}

async fn receive_update(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    Json(update): Json<Update>,
) -> Result<StatusCode, AppError> {
    if let Some(expected) = &state.secret {
        let provided = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
        if provided != Some(expected.as_str()) {
            return Err(AppError::Unauthorized);
        }
    }

    debug!(update_id = update.update_id, "Received update");
    tokio::spawn(async move {
        state.service.handle_update(update).await;
    });
    Ok(StatusCode::OK)
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn metrics() -> impl IntoResponse {
    (
        [("content-type", "text/plain; version=0.0.4")],
        get_metrics().to_prometheus(),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::bot_service;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn update_request(secret: Option<&str>) -> Request<Body> {
        let mut builder = Request::post("/telegram/webhook").header("content-type", "application/json");
        if let Some(secret) = secret {
            builder = builder.header(SECRET_HEADER, secret);
        }
        builder
            .body(Body::from(r#"{"update_id": 1}"#))
            .unwrap()
    }

    #[tokio::test]
    async fn test_update_with_secret_is_accepted() {
        let (service, _dir) = bot_service().await;
        let app = router(service, Some("s3cret".into()));

        let response = app.oneshot(update_request(Some("s3cret"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_wrong_secret_is_rejected() {
        let (service, _dir) = bot_service().await;
        let app = router(service, Some("s3cret".into()));

        let response = app.clone().oneshot(update_request(Some("nope"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app.oneshot(update_request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_no_secret_configured_accepts_any() {
        let (service, _dir) = bot_service().await;
        let app = router(service, None);

        let response = app.oneshot(update_request(None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_and_metrics() {
        let (service, _dir) = bot_service().await;
        let app = router(service, None);

        let response = app
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
