//! GET /api/v1/starters - Suggested opening questions.

use std::time::Instant;

use axum::Json;

use tickertalk_types::starter::{Starter, default_starters};

use crate::http::response::{ApiMeta, ApiResponse};

pub async fn list_starters() -> Json<ApiResponse<Vec<Starter>>> {
    let start = Instant::now();
    Json(ApiResponse::success(default_starters(), ApiMeta::since(start)))
}
