//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! Arc로 래핑되어 여러 요청 간에 안전하게 공유됩니다.
//! Axum의 State extractor를 통해 핸들러에 주입됩니다.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sigbridge_engine::{LifecycleEngine, PositionLedger};

/// 애플리케이션 공유 상태.
#[derive(Clone)]
pub struct AppState {
    /// 주문 라이프사이클 엔진 - 신호 처리의 단일 진입점
    pub engine: Arc<LifecycleEngine>,

    /// 포지션 원장 - 조회 엔드포인트용 핸들
    pub ledger: Arc<PositionLedger>,

    /// 서버 시작 시각
    pub started_at: DateTime<Utc>,

    /// API 버전
    pub version: String,
}

impl AppState {
    /// 새 상태 생성.
    pub fn new(engine: Arc<LifecycleEngine>, ledger: Arc<PositionLedger>) -> Self {
        Self {
            engine,
            ledger,
            started_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// 서버 업타임(초) 반환.
    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}

/// 테스트용 상태 생성. 시뮬레이터 어댑터 하나를 등록합니다.
#[cfg(test)]
pub(crate) fn create_test_state() -> AppState {
    use sigbridge_exchange::{AdapterRegistry, SimulatedAdapter};

    let mut registry = AdapterRegistry::new();
    registry.insert(
        "binance-futures",
        Arc::new(SimulatedAdapter::new("binance-futures")),
    );

    let ledger = Arc::new(PositionLedger::new());
    let engine = Arc::new(LifecycleEngine::new(
        123,
        ledger.clone(),
        Arc::new(registry),
    ));

    AppState::new(engine, ledger)
}
