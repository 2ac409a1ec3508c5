//! 엔진 에러 타입.

use sigbridge_core::{PositionSide, PositionState, SignalAction};
use sigbridge_exchange::ExchangeError;
use thiserror::Error;

/// 신호 처리 중 발생하는 에러.
///
/// 모든 에러는 웹훅 호출자에게 동기적으로 보고됩니다.
/// 엔진 자체는 어떤 에러도 재시도하지 않습니다.
#[derive(Debug, Error)]
pub enum EngineError {
    /// 검증 실패. 처음으로 누락/잘못된 필드를 가리킵니다.
    #[error("Invalid signal: {field}: {reason}")]
    InvalidSignal { field: &'static str, reason: String },

    /// 공유 시크릿 키 불일치.
    #[error("Authentication failed: invalid key")]
    AuthFailure,

    /// 전이 테이블 위반. 현재 상태와 요청 액션을 포함합니다.
    #[error("Illegal transition: {reason} (state={state}, side={side}, action={action})")]
    IllegalTransition {
        state: PositionState,
        side: PositionSide,
        action: SignalAction,
        reason: &'static str,
    },

    /// 거래소 어댑터 호출 실패. 원장은 변경되지 않았습니다.
    ///
    /// 청산 중 실패라면 `order_id`에 진입 주문 ID가 담겨
    /// 운영자가 청산을 재시도할 수 있습니다.
    #[error("Adapter failure: {source}")]
    AdapterFailure {
        #[source]
        source: ExchangeError,
        order_id: Option<String>,
    },

    /// 커밋 시점 경쟁 감지. 주문은 이미 제출된 상태입니다.
    ///
    /// 보상 거래는 자동으로 수행하지 않으며, 주문 ID를 포함해
    /// 수동 정리(reconciliation) 대상으로 보고합니다.
    #[error("Ledger conflict: order {order_id} placed but state changed concurrently")]
    LedgerConflict { order_id: String },
}

impl EngineError {
    /// 기계 판독용 에러 종류 코드.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::InvalidSignal { .. } => "INVALID_SIGNAL",
            EngineError::AuthFailure => "AUTH_FAILURE",
            EngineError::IllegalTransition { .. } => "ILLEGAL_TRANSITION",
            EngineError::AdapterFailure { .. } => "ADAPTER_FAILURE",
            EngineError::LedgerConflict { .. } => "LEDGER_CONFLICT",
        }
    }

    /// 검증 실패 에러 생성 헬퍼.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        EngineError::InvalidSignal {
            field,
            reason: reason.into(),
        }
    }
}
