//! Ingestion endpoints — multipart upload and fetch-by-URL.
//!
//! Both paths delegate to the lifecycle manager, which owns the format
//! guard, the persisted slot, publishing and engine rebinding.

use axum::extract::{Multipart, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;

#[derive(Serialize)]
pub struct IngestResponse {
    pub success: bool,
    pub message: String,
    pub version: u64,
    pub rows: usize,
    pub columns: usize,
    pub slot_path: String,
}

/// `POST /api/data/upload` — replace the dataset from a multipart file.
///
/// Expects one file field; the filename must carry a CSV/TSV extension.
pub async fn upload(
    State(ctx): State<ApiContext>,
    mut multipart: Multipart,
) -> Result<Json<IngestResponse>, ApiError> {
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Could not read upload: {e}")))?;
        file = Some((filename, bytes.to_vec()));
        break;
    }

    let (filename, bytes) = file.ok_or_else(|| {
        ApiError::BadRequest("Multipart body contains no file field".into())
    })?;

    tracing::info!(filename = %filename, size = bytes.len(), "Upload received");

    let receipt = ctx.core.lifecycle.ingest_upload(&filename, bytes).await?;

    Ok(Json(IngestResponse {
        success: true,
        message: format!("'{filename}' uploaded and published"),
        version: receipt.version,
        rows: receipt.rows,
        columns: receipt.columns,
        slot_path: ctx.core.settings.slot_path().display().to_string(),
    }))
}

#[derive(Deserialize)]
pub struct LoadUrlRequest {
    pub file_url: String,
}

/// `POST /api/data/load-url` — replace the dataset from an HTTP(S) URL.
pub async fn load_from_url(
    State(ctx): State<ApiContext>,
    Json(req): Json<LoadUrlRequest>,
) -> Result<Json<IngestResponse>, ApiError> {
    tracing::info!(url = %req.file_url, "URL ingestion requested");

    let receipt = ctx.core.lifecycle.ingest_from_url(&req.file_url).await?;

    Ok(Json(IngestResponse {
        success: true,
        message: format!("Dataset loaded from {}", req.file_url),
        version: receipt.version,
        rows: receipt.rows,
        columns: receipt.columns,
        slot_path: ctx.core.settings.slot_path().display().to_string(),
    }))
}
