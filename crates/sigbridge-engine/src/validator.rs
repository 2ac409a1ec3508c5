//! 신호 검증기.
//!
//! 원시 웹훅 본문을 정규화된 [`Signal`]로 변환합니다. 실패 시
//! 정해진 순서(exchange → symbol → action → type → quantity → price)의
//! 첫 번째 누락/잘못된 필드를 보고합니다. 공유 키 검사는 다른 모든
//! 검증에 앞서 수행되며 별도의 에러로 실패합니다.

use std::collections::HashSet;

use rust_decimal::Decimal;
use sigbridge_core::{OrderType, Signal, SignalAction, SignalPayload, Symbol};
use tracing::warn;

use crate::error::EngineError;

/// 웹훅 신호 검증기.
pub struct SignalValidator {
    key: i64,
    exchanges: HashSet<String>,
}

impl SignalValidator {
    /// 새 검증기 생성.
    ///
    /// `exchanges`는 기동 시 구성된(활성화된) 거래소 식별자 목록입니다.
    /// 여기에 없는 거래소로 온 신호는 검증 실패로 거부됩니다.
    pub fn new(key: i64, exchanges: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            key,
            exchanges: exchanges.into_iter().map(Into::into).collect(),
        }
    }

    /// 페이로드를 검증하고 정규화된 신호를 반환합니다.
    ///
    /// # Errors
    ///
    /// - `EngineError::AuthFailure`: 키 누락 또는 불일치
    /// - `EngineError::InvalidSignal`: 첫 번째 누락/잘못된 필드
    pub fn validate(&self, payload: &SignalPayload) -> Result<Signal, EngineError> {
        // 키 검사가 가장 먼저다. 키가 틀리면 나머지 내용은 보지 않는다.
        match payload.key {
            Some(key) if key == self.key => {}
            _ => {
                warn!("webhook key mismatch");
                return Err(EngineError::AuthFailure);
            }
        }

        let exchange = payload
            .exchange
            .as_deref()
            .ok_or_else(|| EngineError::invalid("exchange", "missing"))?;
        if !self.exchanges.contains(exchange) {
            return Err(EngineError::invalid(
                "exchange",
                format!("{} is not enabled in the config file", exchange),
            ));
        }

        let symbol = payload
            .symbol
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| EngineError::invalid("symbol", "missing"))?;

        let action: SignalAction = payload
            .action
            .as_deref()
            .ok_or_else(|| EngineError::invalid("action", "missing"))?
            .parse()
            .map_err(|e: String| EngineError::invalid("action", e))?;

        let order_type: OrderType = payload
            .order_type
            .as_deref()
            .ok_or_else(|| EngineError::invalid("type", "missing"))?
            .parse()
            .map_err(|e: String| EngineError::invalid("type", e))?;

        // 진입 액션만 수량이 필요하다. 청산 수량은 거래소 조회로 도출된다.
        let quantity = if action.is_opening() {
            let qty = payload
                .quantity
                .ok_or_else(|| EngineError::invalid("quantity", "required for opening actions"))?;
            if qty <= Decimal::ZERO {
                return Err(EngineError::invalid("quantity", "must be positive"));
            }
            Some(qty)
        } else {
            None
        };

        let price = if order_type == OrderType::Limit {
            let price = payload
                .price
                .ok_or_else(|| EngineError::invalid("price", "required for limit orders"))?;
            if price <= Decimal::ZERO {
                return Err(EngineError::invalid("price", "must be positive"));
            }
            Some(price)
        } else {
            None
        };

        Ok(Signal {
            exchange: exchange.to_string(),
            symbol: Symbol::new(symbol),
            action,
            order_type,
            quantity,
            price,
        })
    }
}
