//! GET /api/v1/knowledge - Entries held by the retrieval store.

use std::time::Instant;

use axum::Json;
use axum::extract::State;

use tickertalk_types::knowledge::KnowledgeCounts;

use crate::http::error::AppError;
use crate::http::response::{ApiMeta, ApiResponse};
use crate::state::AppState;

pub async fn get_knowledge(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<KnowledgeCounts>>, AppError> {
    let start = Instant::now();
    let counts = state.knowledge.counts().await?;
    Ok(Json(ApiResponse::success(counts, ApiMeta::since(start))))
}
