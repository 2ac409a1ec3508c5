//! 심볼별 포지션 상태 모델.
//!
//! 이 모듈은 원장(Ledger)이 기록하는 포지션 엔티티를 정의합니다.
//! 포지션은 두 상태(CLOSED/OPEN)만 가지며, 라이프사이클 엔진의
//! 확정된 거래소 응답 이후에만 변경됩니다.

use crate::domain::order::Side;
use crate::types::{Quantity, Symbol};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 포지션 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionState {
    /// 포지션 없음 (초기 상태)
    Closed,
    /// 포지션 보유 중
    Open,
}

impl std::fmt::Display for PositionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionState::Closed => write!(f, "CLOSED"),
            PositionState::Open => write!(f, "OPEN"),
        }
    }
}

/// 포지션 방향.
///
/// `None`은 CLOSED 상태에서만 유효합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionSide {
    /// 방향 없음 (포지션 없음)
    None,
    /// 롱 포지션
    Long,
    /// 숏 포지션
    Short,
}

impl PositionSide {
    /// 이 방향의 포지션을 여는 주문 방향을 반환합니다.
    pub fn entry_order_side(&self) -> Option<Side> {
        match self {
            PositionSide::Long => Some(Side::Buy),
            PositionSide::Short => Some(Side::Sell),
            PositionSide::None => None,
        }
    }

    /// 이 방향의 포지션을 청산하는 반대 주문 방향을 반환합니다.
    pub fn closing_order_side(&self) -> Option<Side> {
        self.entry_order_side().map(|s| s.opposite())
    }
}

impl std::fmt::Display for PositionSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionSide::None => write!(f, "NONE"),
            PositionSide::Long => write!(f, "LONG"),
            PositionSide::Short => write!(f, "SHORT"),
        }
    }
}

/// 심볼 하나에 대한 권위 있는 포지션 기록.
///
/// 불변 조건:
/// - `state == Closed` 이면 `side == None` 이고 `order_id == None`
/// - `state == Open` 이면 `side ∈ {Long, Short}` 이고 `order_id.is_some()`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// 거래 심볼
    pub symbol: Symbol,
    /// 포지션 상태
    pub state: PositionState,
    /// 포지션 방향
    pub side: PositionSide,
    /// 포지션을 연 주문의 거래소 주문 ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    /// 진입 당시 주문 수량
    pub quantity: Quantity,
    /// 포지션 오픈 타임스탬프 (CLOSED면 None)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opened_at: Option<DateTime<Utc>>,
    /// 마지막 업데이트 타임스탬프
    pub updated_at: DateTime<Utc>,
}

impl Position {
    /// 닫힌(기본) 포지션을 생성합니다.
    pub fn closed(symbol: Symbol) -> Self {
        Self {
            symbol,
            state: PositionState::Closed,
            side: PositionSide::None,
            order_id: None,
            quantity: Decimal::ZERO,
            opened_at: None,
            updated_at: Utc::now(),
        }
    }

    /// 열린 포지션을 생성합니다.
    pub fn open(
        symbol: Symbol,
        side: PositionSide,
        order_id: impl Into<String>,
        quantity: Quantity,
    ) -> Self {
        debug_assert!(side != PositionSide::None, "open position requires a side");
        let now = Utc::now();
        Self {
            symbol,
            state: PositionState::Open,
            side,
            order_id: Some(order_id.into()),
            quantity,
            opened_at: Some(now),
            updated_at: now,
        }
    }

    /// 포지션이 열려 있는지 확인합니다.
    pub fn is_open(&self) -> bool {
        self.state == PositionState::Open
    }

    /// 포지션이 닫혀 있는지 확인합니다.
    pub fn is_closed(&self) -> bool {
        self.state == PositionState::Closed
    }

    /// 상태/방향/주문ID 불변 조건이 성립하는지 확인합니다.
    pub fn invariant_holds(&self) -> bool {
        match self.state {
            PositionState::Closed => {
                self.side == PositionSide::None && self.order_id.is_none()
            }
            PositionState::Open => {
                self.side != PositionSide::None && self.order_id.is_some()
            }
        }
    }

    /// 엔진의 결정 근거가 되는 필드들이 같은지 비교합니다.
    ///
    /// 타임스탬프는 결정에 영향을 주지 않으므로 제외합니다.
    /// 원장의 compare-and-transition이 이 비교를 사용합니다.
    pub fn same_decision_state(&self, other: &Position) -> bool {
        self.state == other.state && self.side == other.side && self.order_id == other.order_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_closed_position_invariant() {
        let position = Position::closed(Symbol::new("BTCUSDT"));
        assert!(position.is_closed());
        assert_eq!(position.side, PositionSide::None);
        assert!(position.order_id.is_none());
        assert!(position.invariant_holds());
    }

    #[test]
    fn test_open_position_invariant() {
        let position = Position::open(
            Symbol::new("BTCUSDT"),
            PositionSide::Long,
            "42",
            dec!(1.5),
        );
        assert!(position.is_open());
        assert_eq!(position.order_id.as_deref(), Some("42"));
        assert!(position.invariant_holds());
    }

    #[test]
    fn test_closing_order_side_is_opposite() {
        assert_eq!(PositionSide::Long.closing_order_side(), Some(Side::Sell));
        assert_eq!(PositionSide::Short.closing_order_side(), Some(Side::Buy));
        assert_eq!(PositionSide::None.closing_order_side(), None);
    }

    #[test]
    fn test_same_decision_state_ignores_timestamps() {
        let a = Position::open(Symbol::new("ETHUSDT"), PositionSide::Short, "7", dec!(2));
        let mut b = a.clone();
        b.updated_at = Utc::now();
        assert!(a.same_decision_state(&b));

        let c = Position::closed(Symbol::new("ETHUSDT"));
        assert!(!a.same_decision_state(&c));
    }
}
