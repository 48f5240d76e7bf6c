use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::{
    datasource::DataSource,
    metrics::{self, RequestTimer},
    models::{HealthState, QueryRequest, ResponseBatch},
    DataSourceError, Result,
};

#[derive(Clone)]
pub struct ApiState {
    pub datasource: Arc<DataSource>,
}

pub fn router(datasource: Arc<DataSource>) -> Router {
    Router::new()
        .route("/api/query", post(query))
        .route("/api/health", get(health))
        .route("/metrics", get(metrics_text))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(ApiState { datasource })
}

async fn query(
    State(state): State<ApiState>,
    payload: std::result::Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<ResponseBatch>> {
    let _timer = RequestTimer::new();
    let Json(request) = payload.map_err(|e| DataSourceError::InvalidRequest(e.body_text()))?;

    info!(targets = request.targets.len(), "Received query batch");
    let batch = state.datasource.query(&request).await?;

    Ok(Json(batch))
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let _timer = RequestTimer::new();
    let status = state.datasource.test_datasource().await;

    let code = match status.status {
        HealthState::Success => StatusCode::OK,
        HealthState::Error => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, Json(status))
}

async fn metrics_text() -> Result<String> {
    metrics::render()
}

pub async fn serve(bind_address: &str, datasource: Arc<DataSource>) -> Result<()> {
    let listener = TcpListener::bind(bind_address).await.map_err(|e| {
        DataSourceError::Internal(format!("Failed to bind to address {}: {}", bind_address, e))
    })?;

    info!("Sample data source listening on {}", bind_address);

    axum::serve(listener, router(datasource))
        .await
        .map_err(|e| DataSourceError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
