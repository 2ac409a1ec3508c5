//! Binance USD-M 선물 커넥터.
//!
//! Binance Futures REST API 기반 어댑터 구현.
//! 메인넷과 테스트넷 모두 지원.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, error, warn};

use sigbridge_core::config::ExchangeConfig;
use sigbridge_core::{OrderType, Price, Quantity, Side, Symbol};

use crate::adapter::{AdapterResult, ExchangeAdapter, OrderAck};
use crate::connector::QUERY_MAX_ATTEMPTS;
use crate::ExchangeError;

type HmacSha256 = Hmac<Sha256>;

// ============================================================================
// 설정
// ============================================================================

/// Binance Futures 클라이언트 설정.
///
/// # 보안
/// - `Debug` 구현은 민감 정보(`api_key`, `api_secret`)를 마스킹합니다.
#[derive(Clone)]
pub struct BinanceFuturesConfig {
    /// API 키
    pub api_key: SecretString,
    /// API 시크릿
    pub api_secret: SecretString,
    /// 테스트넷 사용
    pub testnet: bool,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 수신 윈도우 (밀리초)
    pub recv_window: u64,
    /// 기본 URL 오버라이드 (테스트용)
    pub base_url_override: Option<String>,
}

impl fmt::Debug for BinanceFuturesConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinanceFuturesConfig")
            .field("api_key", &"***REDACTED***")
            .field("api_secret", &"***REDACTED***")
            .field("testnet", &self.testnet)
            .field("timeout_secs", &self.timeout_secs)
            .field("recv_window", &self.recv_window)
            .finish()
    }
}

impl BinanceFuturesConfig {
    /// 새 설정 생성.
    pub fn new(api_key: SecretString, api_secret: SecretString) -> Self {
        Self {
            api_key,
            api_secret,
            testnet: false,
            timeout_secs: 10,
            recv_window: 5000,
            base_url_override: None,
        }
    }

    /// 애플리케이션 거래소 설정에서 생성.
    pub fn from_exchange_config(cfg: &ExchangeConfig) -> Self {
        Self {
            api_key: cfg.api_key.clone(),
            api_secret: cfg.api_secret.clone(),
            testnet: cfg.testnet,
            timeout_secs: cfg.timeout_secs,
            recv_window: cfg.recv_window,
            base_url_override: None,
        }
    }

    /// 기본 URL을 오버라이드합니다 (테스트용).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url_override = Some(base_url.into());
        self
    }

    /// REST API 기본 URL 반환.
    pub fn rest_base_url(&self) -> &str {
        if let Some(ref url) = self.base_url_override {
            return url;
        }
        if self.testnet {
            "https://testnet.binancefuture.com"
        } else {
            "https://fapi.binance.com"
        }
    }
}

// ============================================================================
// API 응답 타입
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
struct BinanceOrderResponse {
    symbol: String,
    order_id: i64,
    client_order_id: Option<String>,
    status: String,
    orig_qty: String,
    executed_qty: String,
    side: String,
    #[serde(rename = "type")]
    order_type: String,
}

#[derive(Debug, Deserialize)]
struct BinanceError {
    code: i64,
    msg: String,
}

// ============================================================================
// 클라이언트
// ============================================================================

/// Binance USD-M 선물 클라이언트.
pub struct BinanceFuturesClient {
    config: BinanceFuturesConfig,
    client: Client,
}

impl BinanceFuturesClient {
    /// 새 클라이언트 생성.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `ExchangeError::NetworkError`를 반환합니다.
    pub fn new(config: BinanceFuturesConfig) -> Result<Self, ExchangeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ExchangeError::NetworkError(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self { config, client })
    }

    /// 현재 타임스탬프(밀리초) 반환.
    fn timestamp_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }

    /// HMAC-SHA256으로 쿼리 문자열 서명.
    fn sign(&self, query: &str) -> String {
        let mut mac =
            HmacSha256::new_from_slice(self.config.api_secret.expose_secret().as_bytes())
                .expect("HMAC can take key of any size");
        mac.update(query.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// 파라미터에서 쿼리 문자열 생성.
    fn build_query(params: &[(&str, String)]) -> String {
        params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// 공통 파라미터(타임스탬프, recvWindow)를 붙이고 서명합니다.
    fn signed_query(&self, params: &[(&str, String)]) -> String {
        let mut all_params = params.to_vec();
        all_params.push(("timestamp", Self::timestamp_ms().to_string()));
        all_params.push(("recvWindow", self.config.recv_window.to_string()));

        let query = Self::build_query(&all_params);
        let signature = self.sign(&query);
        format!("{}&signature={}", query, signature)
    }

    /// 서명된 GET 요청.
    async fn signed_get<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> AdapterResult<T> {
        let full_url = format!(
            "{}{}?{}",
            self.config.rest_base_url(),
            endpoint,
            self.signed_query(params)
        );

        debug!("GET (signed) {}", endpoint);

        let response = self
            .client
            .get(&full_url)
            .header("X-MBX-APIKEY", self.config.api_key.expose_secret())
            .send()
            .await
            .map_err(ExchangeError::from)?;

        self.handle_response(response).await
    }

    /// 서명된 POST 요청.
    async fn signed_post<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> AdapterResult<T> {
        let url = format!("{}{}", self.config.rest_base_url(), endpoint);
        let body = self.signed_query(params);

        debug!("POST (signed) {}", endpoint);

        let response = self
            .client
            .post(&url)
            .header("X-MBX-APIKEY", self.config.api_key.expose_secret())
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(ExchangeError::from)?;

        self.handle_response(response).await
    }

    /// 서명된 DELETE 요청.
    async fn signed_delete<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> AdapterResult<T> {
        let full_url = format!(
            "{}{}?{}",
            self.config.rest_base_url(),
            endpoint,
            self.signed_query(params)
        );

        debug!("DELETE (signed) {}", endpoint);

        let response = self
            .client
            .delete(&full_url)
            .header("X-MBX-APIKEY", self.config.api_key.expose_secret())
            .send()
            .await
            .map_err(ExchangeError::from)?;

        self.handle_response(response).await
    }

    /// API 응답 처리.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> AdapterResult<T> {
        let status = response.status();
        let body = response.text().await.map_err(ExchangeError::from)?;

        if status.is_success() {
            serde_json::from_str(&body).map_err(|e| {
                error!("Failed to parse response: {} - Body: {}", e, body);
                ExchangeError::ParseError(e.to_string())
            })
        } else if let Ok(err) = serde_json::from_str::<BinanceError>(&body) {
            Err(Self::map_error_code(err.code, &err.msg))
        } else {
            Err(ExchangeError::ApiError {
                code: i64::from(status.as_u16()),
                message: body,
            })
        }
    }

    /// Binance 에러 코드를 ExchangeError로 매핑.
    fn map_error_code(code: i64, msg: &str) -> ExchangeError {
        match code {
            -1002 => ExchangeError::Unauthorized(msg.to_string()),
            -1003 => ExchangeError::RateLimited,
            -1013 => ExchangeError::InvalidQuantity(msg.to_string()),
            -1021 => ExchangeError::TimestampError(msg.to_string()),
            -2010 => ExchangeError::InsufficientBalance(msg.to_string()),
            -2011 | -2013 => ExchangeError::OrderNotFound(msg.to_string()),
            -2019 => ExchangeError::InsufficientBalance(msg.to_string()),
            _ => ExchangeError::ApiError {
                code,
                message: msg.to_string(),
            },
        }
    }

    /// 문자열에서 Decimal 파싱.
    fn parse_decimal(s: &str) -> AdapterResult<Decimal> {
        s.parse()
            .map_err(|_| ExchangeError::ParseError(format!("invalid decimal: {}", s)))
    }

    /// 주문 파라미터 구성.
    fn order_params(
        symbol: &Symbol,
        side: Side,
        order_type: OrderType,
        quantity: Quantity,
        price: Option<Price>,
        reduce_only: bool,
    ) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("symbol", symbol.to_string()),
            ("side", side.to_string()),
            ("type", order_type.to_string()),
            ("quantity", quantity.to_string()),
        ];

        if order_type == OrderType::Limit {
            if let Some(p) = price {
                params.push(("price", p.to_string()));
            }
            params.push(("timeInForce", "GTC".to_string()));
        }

        if reduce_only {
            params.push(("reduceOnly", "true".to_string()));
        }

        params
    }

    /// 주문 응답을 OrderAck으로 변환.
    fn to_ack(resp: BinanceOrderResponse) -> OrderAck {
        let accepted = !matches!(resp.status.as_str(), "REJECTED" | "EXPIRED");
        OrderAck {
            order_id: resp.order_id.to_string(),
            accepted,
        }
    }
}

#[async_trait]
impl ExchangeAdapter for BinanceFuturesClient {
    fn name(&self) -> &str {
        if self.config.testnet {
            "binance-futures-testnet"
        } else {
            "binance-futures"
        }
    }

    async fn open_position(
        &self,
        symbol: &Symbol,
        side: Side,
        order_type: OrderType,
        quantity: Quantity,
        price: Option<Price>,
    ) -> AdapterResult<OrderAck> {
        let params = Self::order_params(symbol, side, order_type, quantity, price, false);
        let resp: BinanceOrderResponse = self.signed_post("/fapi/v1/order", &params).await?;
        Ok(Self::to_ack(resp))
    }

    async fn query_remaining(&self, order_id: &str, symbol: &Symbol) -> AdapterResult<Quantity> {
        let params = vec![
            ("symbol", symbol.to_string()),
            ("orderId", order_id.to_string()),
        ];

        // 읽기 전용 조회이므로 일시적 에러는 제한적으로 재시도한다
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self
                .signed_get::<BinanceOrderResponse>("/fapi/v1/order", &params)
                .await
            {
                Ok(resp) => return Self::parse_decimal(&resp.executed_qty),
                Err(e) if e.is_retryable() && attempt < QUERY_MAX_ATTEMPTS => {
                    let delay = e.retry_delay_ms().unwrap_or(500);
                    warn!(order_id, attempt, delay_ms = delay, "retrying remaining-size query: {}", e);
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn close_position(
        &self,
        symbol: &Symbol,
        side: Side,
        quantity: Quantity,
        order_type: OrderType,
    ) -> AdapterResult<OrderAck> {
        let params = Self::order_params(symbol, side, order_type, quantity, None, true);
        let resp: BinanceOrderResponse = self.signed_post("/fapi/v1/order", &params).await?;
        Ok(Self::to_ack(resp))
    }

    async fn cancel_order(&self, symbol: &Symbol, order_id: &str) -> AdapterResult<()> {
        let params = vec![
            ("symbol", symbol.to_string()),
            ("orderId", order_id.to_string()),
        ];
        let _: BinanceOrderResponse = self.signed_delete("/fapi/v1/order", &params).await?;
        Ok(())
    }
}
