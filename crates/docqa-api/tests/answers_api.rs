//! API integration tests
//!
//! Exercise the router without a network listener. The answering pipeline is
//! not installed, so these cover the adapter's own behavior: probes,
//! validation, and the not-ready path.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use docqa_api::{create_router, state::AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_app() -> axum::Router {
    create_router(Arc::new(AppState::default()))
}

/// Helper to create a JSON request
fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_readiness_reports_missing_pipeline() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/ready")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let json = body_json(response).await;
    assert_eq!(json["ready"], false);
    assert_eq!(json["checks"]["pipeline_initialized"], false);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["uptime_seconds"].is_number());
    assert!(json["total_requests"].is_number());
}

// =============================================================================
// Answers API Tests
// =============================================================================

#[tokio::test]
async fn test_answers_rejects_empty_document() {
    let response = test_app()
        .oneshot(json_request(
            "POST",
            "/api/v1/answers",
            json!({ "document": "  ", "questions": ["What is covered?"] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_answers_rejects_empty_question_list() {
    let response = test_app()
        .oneshot(json_request(
            "POST",
            "/api/v1/answers",
            json!({ "document": "https://example.com/policy.pdf", "questions": [] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_answers_rejects_blank_question() {
    let response = test_app()
        .oneshot(json_request(
            "POST",
            "/api/v1/answers",
            json!({ "document": "https://example.com/policy.pdf", "questions": ["ok?", " "] }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_answers_unavailable_without_pipeline() {
    let response = test_app()
        .oneshot(json_request(
            "POST",
            "/api/v1/answers",
            json!({
                "document": "https://example.com/policy.pdf",
                "questions": ["What is the grace period?"]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let json = body_json(response).await;
    assert_eq!(json["code"], "SERVICE_UNAVAILABLE");
}

#[tokio::test]
async fn test_openapi_spec_served() {
    let response = test_app()
        .oneshot(
            Request::builder()
                .uri("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["paths"]["/api/v1/answers"].is_object());
}
