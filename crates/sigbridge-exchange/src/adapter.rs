//! 거래소 어댑터 trait 정의.
//!
//! 거래소 계정 하나의 주문 API를 거래소 중립적으로 추상화합니다.
//! 라이프사이클 엔진은 이 trait만을 통해 거래소와 통신합니다.

use async_trait::async_trait;
use sigbridge_core::{OrderType, Price, Quantity, Side, Symbol};

use crate::ExchangeError;

/// 어댑터 작업을 위한 Result 타입.
pub type AdapterResult<T> = Result<T, ExchangeError>;

/// 주문 접수 응답.
#[derive(Debug, Clone)]
pub struct OrderAck {
    /// 거래소가 발급한 주문 ID
    pub order_id: String,
    /// 거래소가 주문을 접수했는지 여부
    pub accepted: bool,
}

/// 거래소 계정 하나에 대한 주문 어댑터.
///
/// 모든 작업은 멱등하지 않습니다. 중복 주문 방지는 호출자(엔진)의
/// 책임입니다. 각 구현은 자체 요청 타임아웃을 가져야 하며, 호출이
/// 원장 잠금을 잡은 채 수행되는 일은 없습니다.
#[async_trait]
pub trait ExchangeAdapter: Send + Sync {
    /// 거래소 이름 반환. 로깅 및 디버깅 목적으로 사용됩니다.
    fn name(&self) -> &str;

    /// 새 포지션을 여는 주문 제출.
    ///
    /// # Errors
    ///
    /// - `ExchangeError::NetworkError` / `Timeout`: 연결 실패
    /// - `ExchangeError::Unauthorized`: 인증 실패
    /// - `ExchangeError::OrderRejected`: 거래소가 주문을 거부
    async fn open_position(
        &self,
        symbol: &Symbol,
        side: Side,
        order_type: OrderType,
        quantity: Quantity,
        price: Option<Price>,
    ) -> AdapterResult<OrderAck>;

    /// 주문의 잔여(체결) 수량 조회.
    ///
    /// 청산 직전에 호출되어 실제로 되돌려야 할 수량을 결정합니다.
    /// 읽기 전용이므로 구현은 일시적 에러에 대해 재시도할 수 있습니다.
    async fn query_remaining(&self, order_id: &str, symbol: &Symbol) -> AdapterResult<Quantity>;

    /// 포지션을 청산하는 반대 방향 주문 제출.
    async fn close_position(
        &self,
        symbol: &Symbol,
        side: Side,
        quantity: Quantity,
        order_type: OrderType,
    ) -> AdapterResult<OrderAck>;

    /// 미체결 주문 취소.
    ///
    /// 엔진의 상태 기계는 이 작업을 사용하지 않습니다.
    /// 운영자의 수동 정리(reconciliation)를 위해 노출됩니다.
    async fn cancel_order(&self, symbol: &Symbol, order_id: &str) -> AdapterResult<()>;
}
