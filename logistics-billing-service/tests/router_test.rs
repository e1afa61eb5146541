//! Router-level tests that drive the service without binding a socket.

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
};
use common::test_config;
use logistics_billing_service::services::InMemoryStore;
use logistics_billing_service::startup::{build_router, AppState};
use std::sync::Arc;
use tower::util::ServiceExt;

fn router() -> axum::Router {
    build_router(AppState::new(test_config(), Arc::new(InMemoryStore::new())))
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Failed to parse JSON")
}

#[tokio::test]
async fn malformed_generate_body_is_a_server_error() {
    let response = router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/invoices/generate")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"contract": 1}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap_or_default().starts_with("Invalid request"));
}

#[tokio::test]
async fn inactive_table_lookup_is_not_found() {
    let response = router()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/freight/quote")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{"rateTableId": "00000000-0000-0000-0000-000000000001", "distance": 1, "weight": 1}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap_or_default().starts_with("No active rate table"));
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let response = router()
        .oneshot(Request::builder().uri("/contracts").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
