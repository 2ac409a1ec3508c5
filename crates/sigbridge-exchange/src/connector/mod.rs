//! 거래소 커넥터 구현.

pub mod binance_futures;
pub mod bybit;

pub use binance_futures::{BinanceFuturesClient, BinanceFuturesConfig};
pub use bybit::{BybitClient, BybitConfig};

/// 읽기 전용 조회의 최대 재시도 횟수.
pub(crate) const QUERY_MAX_ATTEMPTS: u32 = 3;
