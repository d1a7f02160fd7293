//! Health check endpoint.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub storage: String,
    pub jobs: u64,
    pub version: String,
}

/// Health check endpoint.
/// GET /health
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let jobs = state.stores.jobs.clone();
    let count = state.run(move |_| jobs.count_all()).await?;

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        storage: state
            .db_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "in-memory".to_string()),
        jobs: count,
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}
