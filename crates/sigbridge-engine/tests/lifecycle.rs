//! 라이프사이클 엔진 통합 테스트.
//!
//! 호출 횟수를 기록하는 모의 어댑터로 전이 테이블과
//! 커밋 프로토콜을 검증합니다.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal_macros::dec;
use sigbridge_core::{OrderType, PositionSide, Price, Quantity, Side, SignalPayload, Symbol};
use sigbridge_engine::{EngineError, LifecycleEngine, PositionLedger};
use sigbridge_exchange::{
    AdapterRegistry, AdapterResult, ExchangeAdapter, ExchangeError, OrderAck,
};

const KEY: i64 = 123;
const EXCHANGE: &str = "binance-futures";

/// 호출 횟수를 세는 모의 어댑터.
struct CountingAdapter {
    open_calls: AtomicUsize,
    query_calls: AtomicUsize,
    close_calls: AtomicUsize,
    /// 마지막 청산 호출에 쓰인 주문 유형
    close_order_type: Mutex<Option<OrderType>>,
    remaining: Quantity,
    fail_open: bool,
    fail_close: bool,
    /// 진입 호출을 지연시켜 경쟁 윈도우를 넓힌다
    open_delay: Option<Duration>,
    next_order_id: AtomicUsize,
}

impl CountingAdapter {
    fn new() -> Self {
        Self {
            open_calls: AtomicUsize::new(0),
            query_calls: AtomicUsize::new(0),
            close_calls: AtomicUsize::new(0),
            close_order_type: Mutex::new(None),
            remaining: dec!(1),
            fail_open: false,
            fail_close: false,
            open_delay: None,
            next_order_id: AtomicUsize::new(1),
        }
    }

    fn with_remaining(mut self, remaining: Quantity) -> Self {
        self.remaining = remaining;
        self
    }

    fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = Some(delay);
        self
    }

    fn issue_id(&self) -> String {
        format!("ord-{}", self.next_order_id.fetch_add(1, Ordering::SeqCst))
    }
}

#[async_trait]
impl ExchangeAdapter for CountingAdapter {
    fn name(&self) -> &str {
        EXCHANGE
    }

    async fn open_position(
        &self,
        _symbol: &Symbol,
        _side: Side,
        _order_type: OrderType,
        _quantity: Quantity,
        _price: Option<Price>,
    ) -> AdapterResult<OrderAck> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.open_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_open {
            return Err(ExchangeError::NetworkError("connection refused".into()));
        }
        Ok(OrderAck {
            order_id: self.issue_id(),
            accepted: true,
        })
    }

    async fn query_remaining(&self, _order_id: &str, _symbol: &Symbol) -> AdapterResult<Quantity> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.remaining)
    }

    async fn close_position(
        &self,
        _symbol: &Symbol,
        _side: Side,
        _quantity: Quantity,
        order_type: OrderType,
    ) -> AdapterResult<OrderAck> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        *self.close_order_type.lock().unwrap() = Some(order_type);
        if self.fail_close {
            return Err(ExchangeError::Timeout("close timed out".into()));
        }
        Ok(OrderAck {
            order_id: self.issue_id(),
            accepted: true,
        })
    }

    async fn cancel_order(&self, _symbol: &Symbol, _order_id: &str) -> AdapterResult<()> {
        Ok(())
    }
}

fn build_engine(adapter: Arc<CountingAdapter>) -> (LifecycleEngine, Arc<PositionLedger>) {
    let mut registry = AdapterRegistry::new();
    registry.insert(EXCHANGE, adapter);
    let ledger = Arc::new(PositionLedger::new());
    let engine = LifecycleEngine::new(KEY, ledger.clone(), Arc::new(registry));
    (engine, ledger)
}

fn buy(symbol: &str, quantity: Quantity) -> SignalPayload {
    SignalPayload::market(KEY, EXCHANGE, symbol, "buy", Some(quantity))
}

fn sell(symbol: &str, quantity: Quantity) -> SignalPayload {
    SignalPayload::market(KEY, EXCHANGE, symbol, "sell", Some(quantity))
}

fn close(symbol: &str, action: &str) -> SignalPayload {
    SignalPayload::market(KEY, EXCHANGE, symbol, action, None)
}

#[tokio::test]
async fn buy_on_closed_opens_long() {
    let adapter = Arc::new(CountingAdapter::new());
    let (engine, ledger) = build_engine(adapter.clone());

    let execution = engine.handle(buy("BTCUSDT", dec!(1))).await.unwrap();

    assert_eq!(adapter.open_calls.load(Ordering::SeqCst), 1);
    assert_eq!(execution.quantity, dec!(1));

    let position = ledger.get(&Symbol::new("BTCUSDT"));
    assert!(position.is_open());
    assert_eq!(position.side, PositionSide::Long);
    assert_eq!(position.order_id.as_deref(), Some(execution.order_id.as_str()));
}

#[tokio::test]
async fn closelong_queries_remaining_then_closes() {
    let adapter = Arc::new(CountingAdapter::new().with_remaining(dec!(0.7)));
    let (engine, ledger) = build_engine(adapter.clone());

    engine.handle(buy("BTCUSDT", dec!(1))).await.unwrap();
    let execution = engine.handle(close("BTCUSDT", "closelong")).await.unwrap();

    // 잔여 수량 조회 후 그 수량으로 반대 주문이 나간다
    assert_eq!(adapter.query_calls.load(Ordering::SeqCst), 1);
    assert_eq!(adapter.close_calls.load(Ordering::SeqCst), 1);
    assert_eq!(execution.quantity, dec!(0.7));

    let position = ledger.get(&Symbol::new("BTCUSDT"));
    assert!(position.is_closed());
    assert_eq!(position.side, PositionSide::None);
    assert!(position.order_id.is_none());
}

#[tokio::test]
async fn close_with_limit_signal_still_submits_market_order() {
    let adapter = Arc::new(CountingAdapter::new());
    let (engine, ledger) = build_engine(adapter.clone());

    engine.handle(buy("BTCUSDT", dec!(1))).await.unwrap();

    // 지정가 청산 신호가 와도 청산 주문은 시장가여야 한다
    let mut payload = close("BTCUSDT", "closelong");
    payload.order_type = Some("limit".to_string());
    payload.price = Some(dec!(50000));

    engine.handle(payload).await.unwrap();

    assert_eq!(
        *adapter.close_order_type.lock().unwrap(),
        Some(OrderType::Market)
    );
    assert!(ledger.get(&Symbol::new("BTCUSDT")).is_closed());
}

#[tokio::test]
async fn double_close_rejected_with_one_adapter_call() {
    let adapter = Arc::new(CountingAdapter::new());
    let (engine, _ledger) = build_engine(adapter.clone());

    engine.handle(buy("BTCUSDT", dec!(1))).await.unwrap();
    engine.handle(close("BTCUSDT", "closelong")).await.unwrap();

    let err = engine
        .handle(close("BTCUSDT", "closelong"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::IllegalTransition { .. }));

    // 두 번째 청산은 어댑터에 닿지 않는다
    assert_eq!(adapter.close_calls.load(Ordering::SeqCst), 1);
    assert_eq!(adapter.query_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn side_mismatch_rejected_without_adapter_call() {
    let adapter = Arc::new(CountingAdapter::new());
    let (engine, ledger) = build_engine(adapter.clone());

    engine.handle(buy("BTCUSDT", dec!(1))).await.unwrap();

    let err = engine
        .handle(close("BTCUSDT", "closeshort"))
        .await
        .unwrap_err();
    match err {
        EngineError::IllegalTransition { reason, .. } => assert_eq!(reason, "side mismatch"),
        other => panic!("unexpected error: {:?}", other),
    }

    // 포지션은 그대로 열려 있다
    assert!(ledger.get(&Symbol::new("BTCUSDT")).is_open());
    assert_eq!(adapter.query_calls.load(Ordering::SeqCst), 0);
    assert_eq!(adapter.close_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn close_on_closed_rejected() {
    let adapter = Arc::new(CountingAdapter::new());
    let (engine, _ledger) = build_engine(adapter.clone());

    let err = engine
        .handle(close("BTCUSDT", "closelong"))
        .await
        .unwrap_err();
    match err {
        EngineError::IllegalTransition { reason, .. } => {
            assert_eq!(reason, "no open position to close");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(adapter.query_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn open_on_open_rejected() {
    let adapter = Arc::new(CountingAdapter::new());
    let (engine, _ledger) = build_engine(adapter.clone());

    engine.handle(buy("BTCUSDT", dec!(1))).await.unwrap();
    let err = engine.handle(sell("BTCUSDT", dec!(1))).await.unwrap_err();

    match err {
        EngineError::IllegalTransition { reason, .. } => {
            assert_eq!(reason, "position already open");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(adapter.open_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn validation_failure_reaches_no_adapter() {
    let adapter = Arc::new(CountingAdapter::new());
    let (engine, _ledger) = build_engine(adapter.clone());

    // 진입 액션인데 수량이 없다
    let mut payload = buy("BTCUSDT", dec!(1));
    payload.quantity = None;

    let err = engine.handle(payload).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidSignal { .. }));
    assert_eq!(adapter.open_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn wrong_key_rejected_before_anything_else() {
    let adapter = Arc::new(CountingAdapter::new());
    let (engine, _ledger) = build_engine(adapter.clone());

    let mut payload = buy("BTCUSDT", dec!(1));
    payload.key = Some(0);

    let err = engine.handle(payload).await.unwrap_err();
    assert!(matches!(err, EngineError::AuthFailure));
    assert_eq!(adapter.open_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn adapter_failure_on_open_leaves_ledger_closed() {
    let adapter = Arc::new(CountingAdapter::new().failing_open());
    let (engine, ledger) = build_engine(adapter.clone());

    let err = engine.handle(buy("BTCUSDT", dec!(1))).await.unwrap_err();
    assert!(matches!(err, EngineError::AdapterFailure { .. }));

    // 미확정 주문으로 포지션을 열지 않는다
    assert!(ledger.get(&Symbol::new("BTCUSDT")).is_closed());
}

#[tokio::test]
async fn adapter_failure_on_close_keeps_position_and_order_id() {
    let adapter = Arc::new(CountingAdapter::new().failing_close());
    let (engine, ledger) = build_engine(adapter.clone());

    let opened = engine.handle(buy("BTCUSDT", dec!(1))).await.unwrap();
    let err = engine
        .handle(close("BTCUSDT", "closelong"))
        .await
        .unwrap_err();

    // 살아 있는 포지션은 잊지 않고, 진입 주문 ID를 노출한다
    match err {
        EngineError::AdapterFailure { order_id, .. } => {
            assert_eq!(order_id.as_deref(), Some(opened.order_id.as_str()));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(ledger.get(&Symbol::new("BTCUSDT")).is_open());
}

#[tokio::test]
async fn zero_remaining_closes_ledger_without_order() {
    let adapter = Arc::new(CountingAdapter::new().with_remaining(dec!(0)));
    let (engine, ledger) = build_engine(adapter.clone());

    engine.handle(buy("BTCUSDT", dec!(1))).await.unwrap();
    let execution = engine.handle(close("BTCUSDT", "closelong")).await.unwrap();

    assert_eq!(execution.quantity, dec!(0));
    assert_eq!(adapter.close_calls.load(Ordering::SeqCst), 0);
    assert!(ledger.get(&Symbol::new("BTCUSDT")).is_closed());
}

#[tokio::test]
async fn concurrent_sells_commit_exactly_once() {
    let adapter =
        Arc::new(CountingAdapter::new().with_open_delay(Duration::from_millis(50)));
    let (engine, ledger) = build_engine(adapter.clone());
    let engine = Arc::new(engine);

    let a = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.handle(sell("ETHUSDT", dec!(2))).await })
    };
    let b = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.handle(sell("ETHUSDT", dec!(2))).await })
    };

    let results = [a.await.unwrap(), b.await.unwrap()];
    let successes = results.iter().filter(|r| r.is_ok()).count();

    // 정확히 하나만 커밋되고, 나머지는 불법 전이 또는 커밋 경쟁이다
    assert_eq!(successes, 1);
    for result in &results {
        if let Err(e) = result {
            assert!(matches!(
                e,
                EngineError::IllegalTransition { .. } | EngineError::LedgerConflict { .. }
            ));
        }
    }

    let position = ledger.get(&Symbol::new("ETHUSDT"));
    assert!(position.is_open());
    assert_eq!(position.side, PositionSide::Short);
}
