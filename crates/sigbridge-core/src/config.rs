//! 설정 관리.
//!
//! 이 모듈은 애플리케이션 설정을 정의하고 관리합니다.
//! `config/default.toml`을 기반으로 `SIGBRIDGE__` 접두사의
//! 환경 변수로 오버라이드합니다.

use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// 애플리케이션 설정.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// 서버 설정
    #[serde(default)]
    pub server: ServerConfig,
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
    /// 웹훅 설정
    pub webhook: WebhookConfig,
    /// 거래소 설정 (식별자 -> 설정)
    #[serde(default)]
    pub exchanges: HashMap<String, ExchangeConfig>,
}

/// 서버 설정.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 바인딩할 호스트
    pub host: String,
    /// 리스닝할 포트
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    /// 소켓 주소 반환.
    ///
    /// # Errors
    /// `host:port` 형식이 유효하지 않으면 `AddrParseError`를 반환합니다.
    pub fn socket_addr(&self) -> Result<std::net::SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// 웹훅 설정.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// 공유 시크릿 키. 인바운드 신호의 `key` 필드와 정수 비교됩니다.
    pub key: i64,
}

/// 거래소 계정 설정.
#[derive(Clone, Deserialize)]
pub struct ExchangeConfig {
    /// 이 거래소 활성화 여부. 비활성 거래소로의 신호는 거부됩니다.
    pub enabled: bool,
    /// 테스트넷 사용
    #[serde(default)]
    pub testnet: bool,
    /// 실제 거래소 대신 내장 시뮬레이터 사용
    #[serde(default)]
    pub paper_trading: bool,
    /// API 키
    #[serde(default = "default_secret")]
    pub api_key: SecretString,
    /// API 시크릿
    #[serde(default = "default_secret")]
    pub api_secret: SecretString,
    /// 요청 타임아웃 (초)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// 수신 윈도우 (밀리초)
    #[serde(default = "default_recv_window")]
    pub recv_window: u64,
}

fn default_secret() -> SecretString {
    SecretString::from("")
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_recv_window() -> u64 {
    5000
}

impl std::fmt::Debug for ExchangeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeConfig")
            .field("enabled", &self.enabled)
            .field("testnet", &self.testnet)
            .field("paper_trading", &self.paper_trading)
            .field("api_key", &"***REDACTED***")
            .field("api_secret", &"***REDACTED***")
            .field("timeout_secs", &self.timeout_secs)
            .field("recv_window", &self.recv_window)
            .finish()
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            // 기본값으로 시작
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            // 파일에서 로드
            .add_source(config::File::from(path.as_ref()))
            // 환경 변수로 오버라이드 (예: SIGBRIDGE__WEBHOOK__KEY)
            .add_source(
                config::Environment::with_prefix("SIGBRIDGE")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> Result<Self, config::ConfigError> {
        Self::load("config/default.toml")
    }

    /// 활성화된 거래소 식별자 목록을 반환합니다.
    pub fn enabled_exchanges(&self) -> Vec<&str> {
        self.exchanges
            .iter()
            .filter(|(_, cfg)| cfg.enabled)
            .map(|(id, _)| id.as_str())
            .collect()
    }
}
