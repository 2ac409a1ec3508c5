//! Bybit v5 선형(USDT 무기한) 커넥터.
//!
//! Bybit v5 REST API 기반 어댑터 구현. `X-BAPI-*` 헤더 서명을 사용하며
//! 메인넷과 테스트넷 모두 지원합니다.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
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

/// Bybit 클라이언트 설정.
///
/// # 보안
/// - `Debug` 구현은 민감 정보(`api_key`, `api_secret`)를 마스킹합니다.
#[derive(Clone)]
pub struct BybitConfig {
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

impl fmt::Debug for BybitConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BybitConfig")
            .field("api_key", &"***REDACTED***")
            .field("api_secret", &"***REDACTED***")
            .field("testnet", &self.testnet)
            .field("timeout_secs", &self.timeout_secs)
            .field("recv_window", &self.recv_window)
            .finish()
    }
}

impl BybitConfig {
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
            "https://api-testnet.bybit.com"
        } else {
            "https://api.bybit.com"
        }
    }
}

// ============================================================================
// API 응답 타입
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BybitResponse<T> {
    ret_code: i64,
    ret_msg: String,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BybitOrderResult {
    order_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BybitOrderList {
    list: Vec<BybitOrderEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
struct BybitOrderEntry {
    order_id: String,
    order_status: String,
    qty: String,
    cum_exec_qty: String,
}

// ============================================================================
// 클라이언트
// ============================================================================

/// Bybit v5 선형 파생상품 클라이언트.
pub struct BybitClient {
    config: BybitConfig,
    client: Client,
}

impl BybitClient {
    /// 새 클라이언트 생성.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `ExchangeError::NetworkError`를 반환합니다.
    pub fn new(config: BybitConfig) -> Result<Self, ExchangeError> {
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

    /// v5 서명 생성: HMAC-SHA256(timestamp + api_key + recv_window + payload).
    fn sign(&self, timestamp: u64, payload: &str) -> String {
        let message = format!(
            "{}{}{}{}",
            timestamp,
            self.config.api_key.expose_secret(),
            self.config.recv_window,
            payload
        );
        let mut mac =
            HmacSha256::new_from_slice(self.config.api_secret.expose_secret().as_bytes())
                .expect("HMAC can take key of any size");
        mac.update(message.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// 서명 헤더를 붙인 POST 요청 (JSON 본문).
    async fn signed_post<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        body: &serde_json::Value,
    ) -> AdapterResult<T> {
        let url = format!("{}{}", self.config.rest_base_url(), endpoint);
        let body_str = body.to_string();
        let timestamp = Self::timestamp_ms();
        let signature = self.sign(timestamp, &body_str);

        debug!("POST (signed) {}", endpoint);

        let response = self
            .client
            .post(&url)
            .header("X-BAPI-API-KEY", self.config.api_key.expose_secret())
            .header("X-BAPI-TIMESTAMP", timestamp.to_string())
            .header("X-BAPI-RECV-WINDOW", self.config.recv_window.to_string())
            .header("X-BAPI-SIGN", signature)
            .header("Content-Type", "application/json")
            .body(body_str)
            .send()
            .await
            .map_err(ExchangeError::from)?;

        self.handle_response(response).await
    }

    /// 서명 헤더를 붙인 GET 요청 (쿼리 문자열 서명).
    async fn signed_get<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        query: &str,
    ) -> AdapterResult<T> {
        let url = format!("{}{}?{}", self.config.rest_base_url(), endpoint, query);
        let timestamp = Self::timestamp_ms();
        let signature = self.sign(timestamp, query);

        debug!("GET (signed) {}", endpoint);

        let response = self
            .client
            .get(&url)
            .header("X-BAPI-API-KEY", self.config.api_key.expose_secret())
            .header("X-BAPI-TIMESTAMP", timestamp.to_string())
            .header("X-BAPI-RECV-WINDOW", self.config.recv_window.to_string())
            .header("X-BAPI-SIGN", signature)
            .send()
            .await
            .map_err(ExchangeError::from)?;

        self.handle_response(response).await
    }

    /// API 응답 처리. Bybit는 HTTP 200에 retCode로 에러를 전달한다.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> AdapterResult<T> {
        let status = response.status();
        let body = response.text().await.map_err(ExchangeError::from)?;

        if !status.is_success() {
            return Err(ExchangeError::ApiError {
                code: i64::from(status.as_u16()),
                message: body,
            });
        }

        let envelope: BybitResponse<T> = serde_json::from_str(&body).map_err(|e| {
            error!("Failed to parse response: {} - Body: {}", e, body);
            ExchangeError::ParseError(e.to_string())
        })?;

        if envelope.ret_code != 0 {
            return Err(Self::map_ret_code(envelope.ret_code, &envelope.ret_msg));
        }

        envelope
            .result
            .ok_or_else(|| ExchangeError::ParseError("missing result field".to_string()))
    }

    /// Bybit retCode를 ExchangeError로 매핑.
    fn map_ret_code(code: i64, msg: &str) -> ExchangeError {
        match code {
            10003 | 10004 | 33004 => ExchangeError::Unauthorized(msg.to_string()),
            10006 | 10018 => ExchangeError::RateLimited,
            10002 => ExchangeError::TimestampError(msg.to_string()),
            110007 => ExchangeError::InsufficientBalance(msg.to_string()),
            110001 => ExchangeError::OrderNotFound(msg.to_string()),
            110009 | 110010 => ExchangeError::OrderRejected(msg.to_string()),
            _ => ExchangeError::ApiError {
                code,
                message: msg.to_string(),
            },
        }
    }

    /// 내부 Side를 Bybit 형식으로 변환.
    fn side_str(side: Side) -> &'static str {
        match side {
            Side::Buy => "Buy",
            Side::Sell => "Sell",
        }
    }

    /// 내부 OrderType을 Bybit 형식으로 변환.
    fn order_type_str(order_type: OrderType) -> &'static str {
        match order_type {
            OrderType::Market => "Market",
            OrderType::Limit => "Limit",
        }
    }

    /// 주문 생성 본문 구성.
    fn order_body(
        symbol: &Symbol,
        side: Side,
        order_type: OrderType,
        quantity: Quantity,
        price: Option<Price>,
        reduce_only: bool,
    ) -> serde_json::Value {
        let mut body = json!({
            "category": "linear",
            "symbol": symbol.as_str(),
            "side": Self::side_str(side),
            "orderType": Self::order_type_str(order_type),
            "qty": quantity.to_string(),
        });

        if let Some(p) = price {
            body["price"] = json!(p.to_string());
            body["timeInForce"] = json!("GTC");
        }
        if reduce_only {
            body["reduceOnly"] = json!(true);
        }

        body
    }
}

#[async_trait]
impl ExchangeAdapter for BybitClient {
    fn name(&self) -> &str {
        if self.config.testnet {
            "bybit-testnet"
        } else {
            "bybit"
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
        let body = Self::order_body(symbol, side, order_type, quantity, price, false);
        let result: BybitOrderResult = self.signed_post("/v5/order/create", &body).await?;
        Ok(OrderAck {
            order_id: result.order_id,
            accepted: true,
        })
    }

    async fn query_remaining(&self, order_id: &str, symbol: &Symbol) -> AdapterResult<Quantity> {
        let query = format!(
            "category=linear&symbol={}&orderId={}",
            symbol.as_str(),
            order_id
        );

        // 읽기 전용 조회이므로 일시적 에러는 제한적으로 재시도한다
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self
                .signed_get::<BybitOrderList>("/v5/order/realtime", &query)
                .await
            {
                Ok(result) => {
                    let entry = result
                        .list
                        .into_iter()
                        .next()
                        .ok_or_else(|| ExchangeError::OrderNotFound(order_id.to_string()))?;
                    return entry.cum_exec_qty.parse::<Decimal>().map_err(|_| {
                        ExchangeError::ParseError(format!(
                            "invalid cumExecQty: {}",
                            entry.cum_exec_qty
                        ))
                    });
                }
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
        let body = Self::order_body(symbol, side, order_type, quantity, None, true);
        let result: BybitOrderResult = self.signed_post("/v5/order/create", &body).await?;
        Ok(OrderAck {
            order_id: result.order_id,
            accepted: true,
        })
    }

    async fn cancel_order(&self, symbol: &Symbol, order_id: &str) -> AdapterResult<()> {
        let body = json!({
            "category": "linear",
            "symbol": symbol.as_str(),
            "orderId": order_id,
        });
        let _: BybitOrderResult = self.signed_post("/v5/order/cancel", &body).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn test_client(base_url: &str) -> BybitClient {
        let config = BybitConfig::new(
            SecretString::from("test-key"),
            SecretString::from("test-secret"),
        )
        .with_base_url(base_url);
        BybitClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_open_position_returns_order_id() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v5/order/create")
            .with_status(200)
            .with_body(
                r#"{"retCode":0,"retMsg":"OK","result":{"orderId":"b-123","orderLinkId":""}}"#,
            )
            .create_async()
            .await;

        let client = test_client(&server.url());
        let ack = client
            .open_position(
                &Symbol::new("ETHUSDT"),
                Side::Sell,
                OrderType::Market,
                dec!(2),
                None,
            )
            .await
            .unwrap();

        assert!(ack.accepted);
        assert_eq!(ack.order_id, "b-123");
    }

    #[tokio::test]
    async fn test_ret_code_error_mapping() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v5/order/create")
            .with_status(200)
            .with_body(r#"{"retCode":110007,"retMsg":"insufficient available balance","result":null}"#)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let result = client
            .open_position(
                &Symbol::new("ETHUSDT"),
                Side::Buy,
                OrderType::Market,
                dec!(100),
                None,
            )
            .await;

        assert!(matches!(
            result,
            Err(ExchangeError::InsufficientBalance(_))
        ));
    }

    #[tokio::test]
    async fn test_query_remaining_reads_cum_exec_qty() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock(
                "GET",
                mockito::Matcher::Regex(r"^/v5/order/realtime.*$".to_string()),
            )
            .with_status(200)
            .with_body(
                r#"{"retCode":0,"retMsg":"OK","result":{"list":[
                    {"orderId":"b-123","orderStatus":"Filled","qty":"2","cumExecQty":"1.5"}
                ]}}"#,
            )
            .create_async()
            .await;

        let client = test_client(&server.url());
        let remaining = client
            .query_remaining("b-123", &Symbol::new("ETHUSDT"))
            .await
            .unwrap();

        assert_eq!(remaining, dec!(1.5));
    }
}
