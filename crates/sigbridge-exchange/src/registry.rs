//! 거래소 어댑터 레지스트리.
//!
//! 설정에 선언된 거래소들을 어댑터 인스턴스로 만들어 이름으로
//! 찾을 수 있게 보관합니다. 엔진은 신호의 거래소 식별자로
//! 레지스트리에서 어댑터를 조회합니다.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use sigbridge_core::config::ExchangeConfig;

use crate::connector::{BinanceFuturesClient, BinanceFuturesConfig, BybitClient, BybitConfig};
use crate::simulated::SimulatedAdapter;
use crate::{ExchangeAdapter, ExchangeError};

/// Binance USD-M 선물 거래소 식별자.
pub const BINANCE_FUTURES: &str = "binance-futures";
/// Bybit 선형 파생상품 거래소 식별자.
pub const BYBIT: &str = "bybit";

/// 이름 -> 어댑터 매핑.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn ExchangeAdapter>>,
}

impl AdapterRegistry {
    /// 빈 레지스트리 생성.
    pub fn new() -> Self {
        Self::default()
    }

    /// 어댑터 등록. 같은 이름이 이미 있으면 교체됩니다.
    pub fn insert(&mut self, name: impl Into<String>, adapter: Arc<dyn ExchangeAdapter>) {
        self.adapters.insert(name.into(), adapter);
    }

    /// 이름으로 어댑터 조회.
    pub fn get(&self, name: &str) -> Option<Arc<dyn ExchangeAdapter>> {
        self.adapters.get(name).cloned()
    }

    /// 등록된 거래소 이름인지 확인.
    pub fn contains(&self, name: &str) -> bool {
        self.adapters.contains_key(name)
    }

    /// 등록된 거래소 이름 목록.
    pub fn ids(&self) -> Vec<&str> {
        self.adapters.keys().map(String::as_str).collect()
    }

    /// 설정에서 레지스트리 구성.
    ///
    /// 비활성화된 거래소와 알 수 없는 식별자는 건너뜁니다.
    /// `paper_trading = true`면 실제 커넥터 대신 모의 어댑터를 씁니다.
    ///
    /// # Errors
    ///
    /// 활성화된 거래소의 커넥터 생성에 실패하면 에러를 반환합니다.
    pub fn from_config(
        exchanges: &HashMap<String, ExchangeConfig>,
    ) -> Result<Self, ExchangeError> {
        let mut registry = Self::new();

        for (name, cfg) in exchanges {
            if !cfg.enabled {
                info!(exchange = %name, "exchange disabled, skipping");
                continue;
            }

            if cfg.paper_trading {
                info!(exchange = %name, "paper trading enabled, using simulated adapter");
                registry.insert(name.clone(), Arc::new(SimulatedAdapter::new(name.clone())));
                continue;
            }

            let adapter: Arc<dyn ExchangeAdapter> = match name.as_str() {
                BINANCE_FUTURES => Arc::new(BinanceFuturesClient::new(
                    BinanceFuturesConfig::from_exchange_config(cfg),
                )?),
                BYBIT => Arc::new(BybitClient::new(BybitConfig::from_exchange_config(cfg))?),
                other => {
                    warn!(exchange = %other, "unknown exchange id in config, skipping");
                    continue;
                }
            };

            info!(exchange = %name, testnet = cfg.testnet, "exchange adapter registered");
            registry.insert(name.clone(), adapter);
        }

        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchange_config(enabled: bool, paper_trading: bool) -> ExchangeConfig {
        ExchangeConfig {
            enabled,
            testnet: true,
            paper_trading,
            api_key: "key".into(),
            api_secret: "secret".into(),
            timeout_secs: 10,
            recv_window: 5000,
        }
    }

    #[test]
    fn test_disabled_exchange_is_skipped() {
        let mut exchanges = HashMap::new();
        exchanges.insert(BYBIT.to_string(), exchange_config(false, false));

        let registry = AdapterRegistry::from_config(&exchanges).unwrap();
        assert!(!registry.contains(BYBIT));
    }

    #[test]
    fn test_paper_trading_uses_simulated_adapter() {
        let mut exchanges = HashMap::new();
        exchanges.insert(BINANCE_FUTURES.to_string(), exchange_config(true, true));

        let registry = AdapterRegistry::from_config(&exchanges).unwrap();
        let adapter = registry.get(BINANCE_FUTURES).unwrap();
        assert_eq!(adapter.name(), BINANCE_FUTURES);
    }

    #[test]
    fn test_unknown_exchange_is_skipped() {
        let mut exchanges = HashMap::new();
        exchanges.insert("kraken".to_string(), exchange_config(true, false));

        let registry = AdapterRegistry::from_config(&exchanges).unwrap();
        assert!(!registry.contains("kraken"));
        assert!(registry.ids().is_empty());
    }

    #[test]
    fn test_real_connectors_are_constructed() {
        let mut exchanges = HashMap::new();
        exchanges.insert(BINANCE_FUTURES.to_string(), exchange_config(true, false));
        exchanges.insert(BYBIT.to_string(), exchange_config(true, false));

        let registry = AdapterRegistry::from_config(&exchanges).unwrap();
        assert!(registry.contains(BINANCE_FUTURES));
        assert!(registry.contains(BYBIT));
    }
}
