//! 모의 거래(페이퍼 트레이딩) 어댑터.
//!
//! 실제 거래소 호출 없이 모든 주문을 즉시 체결된 것으로 처리합니다.
//! 설정에서 `paper_trading = true`인 거래소에 사용됩니다.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::info;

use sigbridge_core::{OrderType, Price, Quantity, Side, Symbol};

use crate::adapter::{AdapterResult, ExchangeAdapter, OrderAck};
use crate::ExchangeError;

/// 모의 거래 어댑터.
///
/// 주문 ID별 체결 수량을 메모리에 기록해 두고 잔여 수량 조회에
/// 그대로 돌려줍니다. 프로세스 재시작 시 기록은 사라집니다.
pub struct SimulatedAdapter {
    name: String,
    next_order_id: AtomicU64,
    filled: Mutex<HashMap<String, Quantity>>,
}

impl SimulatedAdapter {
    /// 새 모의 어댑터 생성. `name`은 흉내 내는 거래소 식별자입니다.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            next_order_id: AtomicU64::new(1),
            filled: Mutex::new(HashMap::new()),
        }
    }

    fn issue_order_id(&self) -> String {
        let seq = self.next_order_id.fetch_add(1, Ordering::Relaxed);
        format!("sim-{}", seq)
    }
}

#[async_trait]
impl ExchangeAdapter for SimulatedAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn open_position(
        &self,
        symbol: &Symbol,
        side: Side,
        order_type: OrderType,
        quantity: Quantity,
        _price: Option<Price>,
    ) -> AdapterResult<OrderAck> {
        if quantity <= Quantity::ZERO {
            return Err(ExchangeError::InvalidQuantity(quantity.to_string()));
        }

        let order_id = self.issue_order_id();
        self.filled
            .lock()
            .expect("simulated fill map poisoned")
            .insert(order_id.clone(), quantity);

        info!(
            exchange = %self.name,
            %symbol,
            %side,
            ?order_type,
            %quantity,
            order_id,
            "simulated open order filled"
        );

        Ok(OrderAck {
            order_id,
            accepted: true,
        })
    }

    async fn query_remaining(&self, order_id: &str, _symbol: &Symbol) -> AdapterResult<Quantity> {
        self.filled
            .lock()
            .expect("simulated fill map poisoned")
            .get(order_id)
            .copied()
            .ok_or_else(|| ExchangeError::OrderNotFound(order_id.to_string()))
    }

    async fn close_position(
        &self,
        symbol: &Symbol,
        side: Side,
        quantity: Quantity,
        _order_type: OrderType,
    ) -> AdapterResult<OrderAck> {
        let order_id = self.issue_order_id();

        info!(
            exchange = %self.name,
            %symbol,
            %side,
            %quantity,
            order_id,
            "simulated close order filled"
        );

        Ok(OrderAck {
            order_id,
            accepted: true,
        })
    }

    async fn cancel_order(&self, _symbol: &Symbol, order_id: &str) -> AdapterResult<()> {
        let mut filled = self.filled.lock().expect("simulated fill map poisoned");
        if filled.remove(order_id).is_none() {
            return Err(ExchangeError::OrderNotFound(order_id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_open_then_query_remaining() {
        let adapter = SimulatedAdapter::new("binance-futures");
        let symbol = Symbol::new("BTCUSDT");

        let ack = adapter
            .open_position(&symbol, Side::Buy, OrderType::Market, dec!(0.5), None)
            .await
            .unwrap();
        assert!(ack.accepted);

        let remaining = adapter.query_remaining(&ack.order_id, &symbol).await.unwrap();
        assert_eq!(remaining, dec!(0.5));
    }

    #[tokio::test]
    async fn test_order_ids_are_unique() {
        let adapter = SimulatedAdapter::new("bybit");
        let symbol = Symbol::new("ETHUSDT");

        let a = adapter
            .open_position(&symbol, Side::Buy, OrderType::Market, dec!(1), None)
            .await
            .unwrap();
        let b = adapter
            .open_position(&symbol, Side::Buy, OrderType::Market, dec!(1), None)
            .await
            .unwrap();
        assert_ne!(a.order_id, b.order_id);
    }

    #[tokio::test]
    async fn test_zero_quantity_rejected() {
        let adapter = SimulatedAdapter::new("bybit");
        let symbol = Symbol::new("ETHUSDT");

        let result = adapter
            .open_position(&symbol, Side::Buy, OrderType::Market, dec!(0), None)
            .await;
        assert!(matches!(result, Err(ExchangeError::InvalidQuantity(_))));
    }

    #[tokio::test]
    async fn test_query_unknown_order() {
        let adapter = SimulatedAdapter::new("bybit");
        let result = adapter
            .query_remaining("sim-999", &Symbol::new("ETHUSDT"))
            .await;
        assert!(matches!(result, Err(ExchangeError::OrderNotFound(_))));
    }
}
