//! 웹훅 endpoint.
//!
//! 알림 소스(TradingView 등)가 보내는 신호를 수신해 엔진에 넘깁니다.
//! 신호 처리는 별도 태스크에서 수행되어 클라이언트가 응답 전에
//! 연결을 끊어도 거래소 호출과 원장 커밋은 끝까지 진행됩니다.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use sigbridge_core::SignalPayload;
use tracing::{error, info};

use crate::error::{engine_error_response, WebhookResponse};
use crate::state::AppState;

/// 트레이딩 신호 수신.
///
/// POST /webhook
pub async fn handle_webhook(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SignalPayload>,
) -> impl IntoResponse {
    info!(
        exchange = payload.exchange.as_deref().unwrap_or("-"),
        symbol = payload.symbol.as_deref().unwrap_or("-"),
        action = payload.action.as_deref().unwrap_or("-"),
        "webhook signal received"
    );

    // 신호 처리 자체는 취소 불가능해야 한다. 클라이언트가 끊어도
    // 거래소와 원장이 어긋난 채 남지 않도록 spawn 후 완료를 기다린다.
    let engine = state.engine.clone();
    let handle = tokio::spawn(async move { engine.handle(payload).await });

    match handle.await {
        Ok(Ok(execution)) => {
            let data = match serde_json::to_value(&execution) {
                Ok(data) => data,
                Err(e) => {
                    error!("failed to serialize execution report: {}", e);
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(WebhookResponse::error("INTERNAL", "serialization failure")),
                    );
                }
            };
            (StatusCode::OK, Json(WebhookResponse::success(data)))
        }
        Ok(Err(engine_err)) => engine_error_response(&engine_err),
        Err(join_err) => {
            error!("signal handling task panicked: {}", join_err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(WebhookResponse::error("INTERNAL", "signal handling failed")),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::create_router;
    use crate::state::create_test_state;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn webhook_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn response_body(response: axum::response::Response) -> WebhookResponse {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_valid_buy_signal_returns_200() {
        let app = create_router(Arc::new(create_test_state()));

        let response = app
            .oneshot(webhook_request(serde_json::json!({
                "key": 123,
                "exchange": "binance-futures",
                "symbol": "BTCUSDT",
                "action": "buy",
                "type": "market",
                "quantity": 1
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response_body(response).await;
        assert_eq!(body.status, "success");
        assert!(body.data.is_some());
    }

    #[tokio::test]
    async fn test_wrong_key_returns_400() {
        let app = create_router(Arc::new(create_test_state()));

        let response = app
            .oneshot(webhook_request(serde_json::json!({
                "key": 0,
                "exchange": "binance-futures",
                "symbol": "BTCUSDT",
                "action": "buy",
                "type": "market",
                "quantity": 1
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response_body(response).await;
        assert_eq!(body.code.as_deref(), Some("AUTH_FAILURE"));
    }

    #[tokio::test]
    async fn test_close_without_position_returns_400() {
        let app = create_router(Arc::new(create_test_state()));

        let response = app
            .oneshot(webhook_request(serde_json::json!({
                "key": 123,
                "exchange": "binance-futures",
                "symbol": "BTCUSDT",
                "action": "closelong",
                "type": "market"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response_body(response).await;
        assert_eq!(body.code.as_deref(), Some("ILLEGAL_TRANSITION"));
    }

    #[tokio::test]
    async fn test_open_then_close_round_trip() {
        let state = Arc::new(create_test_state());

        let open = create_router(state.clone())
            .oneshot(webhook_request(serde_json::json!({
                "key": 123,
                "exchange": "binance-futures",
                "symbol": "ETHUSDT",
                "action": "sell",
                "type": "market",
                "quantity": 2
            })))
            .await
            .unwrap();
        assert_eq!(open.status(), StatusCode::OK);

        let close = create_router(state.clone())
            .oneshot(webhook_request(serde_json::json!({
                "key": 123,
                "exchange": "binance-futures",
                "symbol": "ETHUSDT",
                "action": "closeshort",
                "type": "market"
            })))
            .await
            .unwrap();
        assert_eq!(close.status(), StatusCode::OK);

        assert!(state.ledger.open_positions().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_exchange_returns_400() {
        let app = create_router(Arc::new(create_test_state()));

        let response = app
            .oneshot(webhook_request(serde_json::json!({
                "key": 123,
                "exchange": "kraken",
                "symbol": "BTCUSDT",
                "action": "buy",
                "type": "market",
                "quantity": 1
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response_body(response).await;
        assert_eq!(body.code.as_deref(), Some("INVALID_SIGNAL"));
    }
}
