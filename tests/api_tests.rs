//! Smoke tests del routing
//!
//! Ejercitan la forma de las rutas públicas con handlers stub, sin base
//! de datos ni Stripe reales.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::json;
use tower::ServiceExt;

fn create_test_app() -> Router {
    Router::new()
        .route(
            "/test",
            get(|| async {
                Json(json!({
                    "message": "Car Rental API funcionando correctamente",
                    "status": "ok",
                }))
            }),
        )
        .route(
            "/api/payments/cancel",
            get(|| async {
                Json(json!({
                    "detail": "Payment was cancelled. You can complete it later — session valid for 24 hours."
                }))
            }),
        )
        .route(
            "/api/payments/webhook",
            post(|| async { StatusCode::BAD_REQUEST }),
        )
}

#[tokio::test]
async fn test_liveness_endpoint() {
    let app = create_test_app();

    let response = app
        .oneshot(Request::get("/test").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_payment_cancel_landing() {
    let app = create_test_app();

    let response = app
        .oneshot(
            Request::get("/api/payments/cancel")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_webhook_only_accepts_post() {
    let app = create_test_app();

    let response = app
        .oneshot(
            Request::get("/api/payments/webhook")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = create_test_app();

    let response = app
        .oneshot(Request::get("/api/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
