//! 웹훅 응답 형식과 에러 매핑.
//!
//! 모든 엔드포인트는 `{status, data?, code?, message?}` 형식으로
//! 응답합니다. 엔진 에러는 종류별로 HTTP 상태 코드에 매핑됩니다:
//!
//! - 검증/인증/불법 전이 → 400
//! - 원장 커밋 경쟁 → 409
//! - 거래소 호출 실패 → 500

use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sigbridge_engine::EngineError;

/// 웹훅 응답 본문.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookResponse {
    /// "success" 또는 "error"
    pub status: String,
    /// 기계 판독용 에러 코드 (에러일 때만)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// 처리 결과 (성공일 때만)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// 사람이 읽을 수 있는 메시지
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WebhookResponse {
    /// 성공 응답 생성.
    pub fn success(data: Value) -> Self {
        Self {
            status: "success".to_string(),
            code: None,
            data: Some(data),
            message: None,
        }
    }

    /// 에러 응답 생성.
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            code: Some(code.into()),
            data: None,
            message: Some(message.into()),
        }
    }
}

/// 엔진 에러를 HTTP 응답으로 변환합니다.
pub fn engine_error_response(err: &EngineError) -> (StatusCode, Json<WebhookResponse>) {
    let status = match err {
        EngineError::InvalidSignal { .. }
        | EngineError::AuthFailure
        | EngineError::IllegalTransition { .. } => StatusCode::BAD_REQUEST,
        EngineError::LedgerConflict { .. } => StatusCode::CONFLICT,
        EngineError::AdapterFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(WebhookResponse::error(err.kind(), err.to_string())),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_mapping() {
        let (status, _) = engine_error_response(&EngineError::AuthFailure);
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = engine_error_response(&EngineError::invalid("symbol", "missing"));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = engine_error_response(&EngineError::LedgerConflict {
            order_id: "42".into(),
        });
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = engine_error_response(&EngineError::AdapterFailure {
            source: sigbridge_exchange::ExchangeError::RateLimited,
            order_id: None,
        });
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_body_carries_kind() {
        let (_, Json(body)) = engine_error_response(&EngineError::AuthFailure);
        assert_eq!(body.status, "error");
        assert_eq!(body.code.as_deref(), Some("AUTH_FAILURE"));
        assert!(body.data.is_none());
    }

    #[test]
    fn test_success_body_shape() {
        let body = WebhookResponse::success(serde_json::json!({"order_id": "1"}));
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains(r#""status":"success""#));
        assert!(!json.contains("message"));
        assert!(!json.contains("code"));
    }
}
