//! 트레이딩 심볼 정의.
//!
//! 심볼은 거래소 네이티브 형식("BTCUSDT" 등)을 그대로 보존합니다.
//! 대소문자를 구분하며, 거래소 간 정규화는 수행하지 않습니다.
//! 잘못된 심볼에 대한 판단은 거래소가 내립니다.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 거래 가능한 상품을 나타내는 트레이딩 심볼.
///
/// 알림 소스(TradingView 등)가 보내는 문자열을 그대로 래핑합니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// 새 심볼을 생성합니다.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// 심볼 문자열을 반환합니다.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 심볼이 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
