//! GET /api/v1/sessions - Live chat sessions.
//!
//! Sessions exist only while their WebSocket is connected; nothing is
//! persisted.

use std::time::Instant;

use axum::Json;
use axum::extract::State;

use tickertalk_types::chat::SessionInfo;

use crate::http::response::{ApiMeta, ApiResponse};
use crate::state::AppState;

pub async fn list_sessions(State(state): State<AppState>) -> Json<ApiResponse<Vec<SessionInfo>>> {
    let start = Instant::now();
    Json(ApiResponse::success(state.sessions.list(), ApiMeta::since(start)))
}
