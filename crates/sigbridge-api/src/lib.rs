//! # Sigbridge API
//!
//! 웹훅 신호를 수신하는 Axum 기반 HTTP 서버입니다.
//!
//! - `POST /webhook` - 트레이딩 신호 수신 및 처리
//! - `GET /health` - 헬스 체크
//! - `GET /positions` - 열린 포지션 조회

pub mod error;
pub mod routes;
pub mod state;

pub use error::WebhookResponse;
pub use state::AppState;
