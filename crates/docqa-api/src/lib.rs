//! docqa API - REST server
//!
//! Thin HTTP adapter over the answering pipeline: request validation,
//! error-envelope mapping, health/readiness probes, and OpenAPI metadata.
//! All answering logic lives in docqa-pipeline.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;

use crate::state::AppState;

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health_check,
        handlers::health::readiness_check,
        handlers::answers::answers_handler,
    ),
    components(schemas(
        handlers::health::HealthResponse,
        handlers::health::ReadinessResponse,
        handlers::health::ReadinessChecks,
        handlers::answers::AnswersRequest,
        handlers::answers::AnswersResponse,
        handlers::answers::AnswerEntry,
        handlers::answers::SourceRef,
        error::ApiError,
    )),
    tags(
        (name = "health", description = "Liveness and readiness probes"),
        (name = "answers", description = "Document question answering")
    )
)]
pub struct ApiDoc;

/// Assemble the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::health_routes())
        .nest("/api/v1", routes::api_routes())
        .route(
            "/api-docs/openapi.json",
            get(|| async { Json(ApiDoc::openapi()) }),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
