//! Read-only status surfaces: health check and dataset metadata.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::config;
use crate::core_state::{DatasetInfo, StatusReport};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub app_version: &'static str,
    #[serde(flatten)]
    pub report: StatusReport,
}

/// `GET /api/health` — service liveness plus the current dataset shape.
pub async fn health(State(ctx): State<ApiContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        app_version: config::APP_VERSION,
        report: ctx.core.status(),
    })
}

/// `GET /api/data/info` — metadata of the current snapshot; 503 when no
/// dataset has been published.
pub async fn dataset_info(
    State(ctx): State<ApiContext>,
) -> Result<Json<DatasetInfo>, ApiError> {
    ctx.core.dataset_info().map(Json).ok_or(ApiError::NoData)
}
