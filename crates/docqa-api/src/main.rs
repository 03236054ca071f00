//! docqa API Server
//!
//! Serves the document question-answering pipeline over HTTP. The server
//! starts even when collaborators (vector index, model APIs) are
//! unreachable: health endpoints stay up and readiness reports the gap.

use std::sync::Arc;

use docqa_api::{create_router, state::AppState};
use docqa_core::AppConfig;
use docqa_pipeline::QaPipeline;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docqa_api=debug,docqa_pipeline=debug,tower_http=info".into()),
        )
        .init();

    let config = AppConfig::from_env().unwrap_or_default();
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let state = Arc::new(AppState::new(config.clone()));

    match QaPipeline::from_config(&config).await {
        Ok(pipeline) => {
            state.install_pipeline(Arc::new(pipeline)).await;
            state.set_ready(true);
            tracing::info!("answering pipeline initialized");
        }
        Err(err) => {
            tracing::warn!(error = %err, "pipeline unavailable at startup, serving probes only");
        }
    }

    let app = create_router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("docqa API server listening on http://{addr}");
    tracing::info!("OpenAPI spec at http://{addr}/api-docs/openapi.json");

    axum::serve(listener, app).await?;

    Ok(())
}
