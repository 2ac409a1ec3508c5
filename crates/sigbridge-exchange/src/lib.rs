//! # Sigbridge Exchange
//!
//! 거래소 어댑터 추상화와 구현을 제공합니다.
//!
//! - [`ExchangeAdapter`] - 거래소 계정 하나에 대한 주문 API 추상화
//! - [`connector`] - Binance USD-M 선물, Bybit v5 커넥터
//! - [`SimulatedAdapter`] - 자격증명 없이 동작하는 페이퍼 트레이딩 어댑터
//! - [`AdapterRegistry`] - 거래소 식별자 → 어댑터 매핑 (기동 시 1회 구성)

pub mod adapter;
pub mod connector;
pub mod error;
pub mod registry;
pub mod simulated;

pub use adapter::{AdapterResult, ExchangeAdapter, OrderAck};
pub use error::ExchangeError;
pub use registry::AdapterRegistry;
pub use simulated::SimulatedAdapter;
