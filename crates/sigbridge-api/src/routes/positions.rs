//! 포지션 조회 endpoint.
//!
//! 원장의 열린 포지션 스냅샷을 반환합니다. 운영자가 수동
//! 정리(reconciliation) 시 현재 상태를 확인하는 용도입니다.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::error::WebhookResponse;
use crate::state::AppState;

/// 열린 포지션 목록 조회.
///
/// GET /positions
pub async fn list_open_positions(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let positions = state.ledger.open_positions();
    match serde_json::to_value(&positions) {
        Ok(data) => (StatusCode::OK, Json(WebhookResponse::success(data))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(WebhookResponse::error("INTERNAL", e.to_string())),
        ),
    }
}
