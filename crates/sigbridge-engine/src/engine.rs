//! 주문 라이프사이클 엔진.
//!
//! 검증된 신호와 현재 원장 상태로부터 합법적인 전이를 판정하고,
//! 거래소 호출 후 확정 응답이 있을 때에만 원장을 커밋합니다.
//!
//! 커밋 프로토콜:
//! 1. 현재 포지션을 읽는다
//! 2. 전이 테이블을 평가한다 (불법이면 여기서 거부)
//! 3. 잠금 없이 거래소 어댑터를 호출한다
//! 4. 성공 응답에 한해 compare-and-transition으로 커밋한다
//!
//! 커밋이 경쟁에서 지면 이미 제출된 주문을 되돌리지 않고
//! 주문 ID와 함께 `LedgerConflict`로 보고합니다.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use sigbridge_core::{
    OrderType, Position, PositionSide, Quantity, Signal, SignalAction, SignalPayload, Symbol,
};
use sigbridge_exchange::{AdapterRegistry, ExchangeAdapter, OrderAck};
use tracing::{info, warn};

use crate::error::EngineError;
use crate::ledger::PositionLedger;
use crate::validator::SignalValidator;

/// 신호 하나를 처리한 결과 보고.
#[derive(Debug, Clone, Serialize)]
pub struct Execution {
    /// 대상 거래소
    pub exchange: String,
    /// 거래 심볼
    pub symbol: Symbol,
    /// 수행한 액션
    pub action: SignalAction,
    /// 이번 요청으로 제출된 주문의 ID
    pub order_id: String,
    /// 제출한 주문 수량
    pub quantity: Quantity,
    /// 커밋 후의 포지션
    pub position: Position,
}

/// 판정된 전이.
enum Transition {
    Open(PositionSide),
    Close(PositionSide),
}

/// 주문 라이프사이클 엔진.
///
/// 원장과 어댑터 레지스트리를 주입받는 명시적 소유 컴포넌트입니다.
/// 동시 호출에 안전하며, 심볼별 직렬화는 원장의
/// compare-and-transition이 보장합니다.
pub struct LifecycleEngine {
    validator: SignalValidator,
    ledger: Arc<PositionLedger>,
    adapters: Arc<AdapterRegistry>,
}

impl LifecycleEngine {
    /// 새 엔진 생성.
    ///
    /// 검증기는 레지스트리에 등록된 거래소만 허용하도록 구성됩니다.
    pub fn new(key: i64, ledger: Arc<PositionLedger>, adapters: Arc<AdapterRegistry>) -> Self {
        let validator = SignalValidator::new(key, adapters.ids());
        Self {
            validator,
            ledger,
            adapters,
        }
    }

    /// 웹훅 페이로드 하나를 처리합니다.
    ///
    /// # Errors
    ///
    /// - `AuthFailure` / `InvalidSignal`: 검증 단계 거부, 어댑터 호출 없음
    /// - `IllegalTransition`: 전이 테이블 위반, 어댑터 호출 없음
    /// - `AdapterFailure`: 거래소 호출 실패, 원장 무변경
    /// - `LedgerConflict`: 커밋 경쟁, 주문은 이미 제출됨
    pub async fn handle(&self, payload: SignalPayload) -> Result<Execution, EngineError> {
        let signal = self.validator.validate(&payload)?;

        let adapter = self
            .adapters
            .get(&signal.exchange)
            .ok_or_else(|| EngineError::invalid("exchange", "no adapter registered"))?;

        let current = self.ledger.get(&signal.symbol);

        match Self::decide(&current, signal.action)? {
            Transition::Open(side) => self.open(&signal, side, &current, adapter).await,
            Transition::Close(side) => self.close(&signal, side, &current, adapter).await,
        }
    }

    /// 전이 테이블 평가. 불법 조합은 어댑터 호출 전에 거부됩니다.
    fn decide(current: &Position, action: SignalAction) -> Result<Transition, EngineError> {
        let illegal = |reason: &'static str| EngineError::IllegalTransition {
            state: current.state,
            side: current.side,
            action,
            reason,
        };

        if action.is_opening() {
            if current.is_open() {
                return Err(illegal("position already open"));
            }
            return Ok(Transition::Open(action.position_side()));
        }

        // 청산 액션
        if current.is_closed() {
            return Err(illegal("no open position to close"));
        }
        if current.side != action.position_side() {
            return Err(illegal("side mismatch"));
        }
        Ok(Transition::Close(current.side))
    }

    /// 진입 전이 실행.
    async fn open(
        &self,
        signal: &Signal,
        side: PositionSide,
        expected: &Position,
        adapter: Arc<dyn ExchangeAdapter>,
    ) -> Result<Execution, EngineError> {
        let quantity = signal
            .quantity
            .ok_or_else(|| EngineError::invalid("quantity", "required for opening actions"))?;
        let order_side = side
            .entry_order_side()
            .ok_or_else(|| EngineError::invalid("action", "not an opening action"))?;

        let ack = adapter
            .open_position(
                &signal.symbol,
                order_side,
                signal.order_type,
                quantity,
                signal.price,
            )
            .await
            .map_err(|source| EngineError::AdapterFailure {
                source,
                order_id: None,
            })?;
        Self::require_accepted(&ack)?;

        let next = Position::open(signal.symbol.clone(), side, ack.order_id.clone(), quantity);
        self.commit(signal, expected, next.clone(), &ack.order_id)?;

        info!(
            exchange = %signal.exchange,
            symbol = %signal.symbol,
            %side,
            %quantity,
            order_id = %ack.order_id,
            "position opened"
        );

        Ok(Execution {
            exchange: signal.exchange.clone(),
            symbol: signal.symbol.clone(),
            action: signal.action,
            order_id: ack.order_id,
            quantity,
            position: next,
        })
    }

    /// 청산 전이 실행.
    ///
    /// 청산 수량은 신호가 아니라 거래소의 실시간 잔여 수량 조회로
    /// 도출됩니다. 부분 체결이나 외부 개입으로 포지션 크기가 진입
    /// 시점과 달라졌을 수 있기 때문입니다. 청산 주문 자체는 신호의
    /// 주문 유형과 무관하게 항상 시장가입니다.
    async fn close(
        &self,
        signal: &Signal,
        side: PositionSide,
        expected: &Position,
        adapter: Arc<dyn ExchangeAdapter>,
    ) -> Result<Execution, EngineError> {
        let entry_order_id = expected.order_id.clone().ok_or_else(|| {
            // 원장 불변 조건상 도달 불가
            EngineError::IllegalTransition {
                state: expected.state,
                side: expected.side,
                action: signal.action,
                reason: "open position has no order id",
            }
        })?;
        let close_side = side.closing_order_side().ok_or_else(|| {
            EngineError::IllegalTransition {
                state: expected.state,
                side: expected.side,
                action: signal.action,
                reason: "open position has no side",
            }
        })?;

        let remaining = adapter
            .query_remaining(&entry_order_id, &signal.symbol)
            .await
            .map_err(|source| EngineError::AdapterFailure {
                source,
                order_id: Some(entry_order_id.clone()),
            })?;

        // 잔여 수량이 0이면 거래소 쪽은 이미 닫힌 것이다.
        // 주문 없이 원장만 CLOSED로 맞춘다.
        if remaining <= Decimal::ZERO {
            warn!(
                symbol = %signal.symbol,
                order_id = %entry_order_id,
                "remaining size is zero, closing ledger entry without an order"
            );
            let next = Position::closed(signal.symbol.clone());
            self.commit(signal, expected, next.clone(), &entry_order_id)?;
            return Ok(Execution {
                exchange: signal.exchange.clone(),
                symbol: signal.symbol.clone(),
                action: signal.action,
                order_id: entry_order_id,
                quantity: Decimal::ZERO,
                position: next,
            });
        }

        // 청산은 신호의 주문 유형과 무관하게 항상 시장가로 나간다.
        // 지정가 청산이 체결되지 않으면 포지션이 열린 채 방치된다.
        let ack = adapter
            .close_position(&signal.symbol, close_side, remaining, OrderType::Market)
            .await
            .map_err(|source| EngineError::AdapterFailure {
                source,
                order_id: Some(entry_order_id.clone()),
            })?;
        Self::require_accepted(&ack)?;

        let next = Position::closed(signal.symbol.clone());
        self.commit(signal, expected, next.clone(), &ack.order_id)?;

        info!(
            exchange = %signal.exchange,
            symbol = %signal.symbol,
            close_side = %close_side,
            quantity = %remaining,
            order_id = %ack.order_id,
            "position closed"
        );

        Ok(Execution {
            exchange: signal.exchange.clone(),
            symbol: signal.symbol.clone(),
            action: signal.action,
            order_id: ack.order_id,
            quantity: remaining,
            position: next,
        })
    }

    /// 거래소가 접수를 거부한 주문은 실패로 취급합니다.
    fn require_accepted(ack: &OrderAck) -> Result<(), EngineError> {
        if ack.accepted {
            return Ok(());
        }
        Err(EngineError::AdapterFailure {
            source: sigbridge_exchange::ExchangeError::OrderRejected(format!(
                "order {} not accepted by exchange",
                ack.order_id
            )),
            order_id: Some(ack.order_id.clone()),
        })
    }

    /// 확정된 거래소 응답 이후의 원장 커밋.
    fn commit(
        &self,
        signal: &Signal,
        expected: &Position,
        next: Position,
        order_id: &str,
    ) -> Result<(), EngineError> {
        if self
            .ledger
            .compare_and_transition(&signal.symbol, expected, next)
        {
            return Ok(());
        }

        // 주문은 이미 나갔다. 보상 거래 없이 수동 정리 대상으로 보고한다.
        warn!(
            symbol = %signal.symbol,
            order_id,
            "ledger commit lost the race, manual reconciliation required"
        );
        Err(EngineError::LedgerConflict {
            order_id: order_id.to_string(),
        })
    }

    /// 원장 핸들 반환 (조회 엔드포인트용).
    pub fn ledger(&self) -> &Arc<PositionLedger> {
        &self.ledger
    }
}
