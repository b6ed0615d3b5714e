//! Question-answering endpoint.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::query::Answer;

#[derive(Deserialize)]
pub struct AskRequest {
    pub question: String,
}

/// `POST /api/ask` — answer a question against the bound dataset.
///
/// The response is tagged with the dataset version the question actually
/// ran against. Answers are not cached; identical questions may differ.
pub async fn ask(
    State(ctx): State<ApiContext>,
    Json(req): Json<AskRequest>,
) -> Result<Json<Answer>, ApiError> {
    let answer = ctx.core.query.ask(&req.question).await?;
    tracing::debug!(version = answer.version, "Question answered");
    Ok(Json(answer))
}
