//! HTTP 라우팅.

pub mod health;
pub mod positions;
pub mod webhook;

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// 애플리케이션 라우터 생성.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/webhook", post(webhook::handle_webhook))
        .route("/health", get(health::health_check))
        .route("/positions", get(positions::list_open_positions))
        .layer(TraceLayer::new_for_http())
        // 거래소 호출 두 번(조회 + 청산)과 재시도를 감안한 상한
        .layer(TimeoutLayer::new(Duration::from_secs(60)))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
