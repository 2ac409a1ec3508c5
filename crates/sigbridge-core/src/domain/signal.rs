//! 인바운드 트레이딩 시그널.
//!
//! 이 모듈은 웹훅으로 수신되는 매매 신호 관련 타입을 정의합니다:
//! - `SignalAction` - 신호 액션 (진입/청산)
//! - `SignalPayload` - 검증 전 원시 웹훅 본문
//! - `Signal` - 검증을 통과한 정규화된 신호

use crate::domain::order::{OrderType, Side};
use crate::domain::position::PositionSide;
use crate::types::{Price, Quantity, Symbol};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 수행할 액션의 종류를 나타내는 신호 액션.
///
/// 진입 액션(`buy`/`sell`)은 신호의 `quantity`를 사용하고,
/// 청산 액션(`closelong`/`closeshort`)은 거래소의 잔여 수량 조회로
/// 수량을 도출합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalAction {
    /// 롱 포지션 진입
    Buy,
    /// 숏 포지션 진입
    Sell,
    /// 롱 포지션 청산
    CloseLong,
    /// 숏 포지션 청산
    CloseShort,
}

impl SignalAction {
    /// 포지션을 여는 액션인지 확인합니다.
    pub fn is_opening(&self) -> bool {
        matches!(self, SignalAction::Buy | SignalAction::Sell)
    }

    /// 포지션을 닫는 액션인지 확인합니다.
    pub fn is_closing(&self) -> bool {
        !self.is_opening()
    }

    /// 이 액션이 대상으로 하는 포지션 방향을 반환합니다.
    pub fn position_side(&self) -> PositionSide {
        match self {
            SignalAction::Buy | SignalAction::CloseLong => PositionSide::Long,
            SignalAction::Sell | SignalAction::CloseShort => PositionSide::Short,
        }
    }

    /// 진입 주문의 방향을 반환합니다 (청산 액션이면 None).
    pub fn entry_order_side(&self) -> Option<Side> {
        match self {
            SignalAction::Buy => Some(Side::Buy),
            SignalAction::Sell => Some(Side::Sell),
            _ => None,
        }
    }
}

impl FromStr for SignalAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(SignalAction::Buy),
            "sell" => Ok(SignalAction::Sell),
            "closelong" => Ok(SignalAction::CloseLong),
            "closeshort" => Ok(SignalAction::CloseShort),
            other => Err(format!("unknown action: {}", other)),
        }
    }
}

impl std::fmt::Display for SignalAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalAction::Buy => write!(f, "buy"),
            SignalAction::Sell => write!(f, "sell"),
            SignalAction::CloseLong => write!(f, "closelong"),
            SignalAction::CloseShort => write!(f, "closeshort"),
        }
    }
}

/// 검증 전의 원시 웹훅 본문.
///
/// 모든 필드가 Option인 이유는 검증기가 "처음으로 누락/잘못된 필드"를
/// 정해진 순서대로 보고해야 하기 때문입니다. 역직렬화 단계에서
/// 실패시키면 그 순서를 보장할 수 없습니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignalPayload {
    /// 공유 시크릿 키 (정수 비교)
    pub key: Option<i64>,
    /// 대상 거래소 식별자
    pub exchange: Option<String>,
    /// 거래소 네이티브 심볼
    pub symbol: Option<String>,
    /// 액션 문자열 ("buy" | "sell" | "closelong" | "closeshort")
    pub action: Option<String>,
    /// 주문 유형 문자열 ("market" | "limit")
    #[serde(rename = "type")]
    pub order_type: Option<String>,
    /// 주문 수량 (진입 액션에 필수)
    pub quantity: Option<Quantity>,
    /// 지정가 (지정가 주문에 필수)
    pub price: Option<Price>,
}

impl SignalPayload {
    /// 시장가 진입/청산 페이로드를 생성합니다 (테스트 및 내부용).
    pub fn market(
        key: i64,
        exchange: impl Into<String>,
        symbol: impl Into<String>,
        action: impl Into<String>,
        quantity: Option<Quantity>,
    ) -> Self {
        Self {
            key: Some(key),
            exchange: Some(exchange.into()),
            symbol: Some(symbol.into()),
            action: Some(action.into()),
            order_type: Some("market".to_string()),
            quantity,
            price: None,
        }
    }
}

/// 검증을 통과한 정규화된 트레이딩 신호.
///
/// 불변 조건: 진입 액션이면 `quantity`는 항상 Some이고,
/// 지정가 주문이면 `price`는 항상 Some입니다. 이 조건은
/// 검증기만이 `Signal`을 생성하는 것으로 보장됩니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    /// 대상 거래소 식별자
    pub exchange: String,
    /// 거래 심볼
    pub symbol: Symbol,
    /// 신호 액션
    pub action: SignalAction,
    /// 주문 유형
    pub order_type: OrderType,
    /// 주문 수량 (진입 액션에만 의미 있음)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Quantity>,
    /// 지정가 (지정가 주문에만 의미 있음)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Price>,
}

impl Signal {
    /// 포지션을 여는 신호인지 확인합니다.
    pub fn is_opening(&self) -> bool {
        self.action.is_opening()
    }

    /// 포지션을 닫는 신호인지 확인합니다.
    pub fn is_closing(&self) -> bool {
        self.action.is_closing()
    }
}
