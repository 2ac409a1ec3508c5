//! 웹훅 트레이딩 브리지 서버.
//!
//! 알림 소스의 신호를 웹훅으로 받아 거래소 주문으로 변환하는
//! Axum 기반 HTTP 서버를 시작합니다.

use std::sync::Arc;

use tracing::{info, warn};

use sigbridge_api::routes::create_router;
use sigbridge_api::state::AppState;
use sigbridge_core::config::AppConfig;
use sigbridge_core::logging::init_logging;
use sigbridge_engine::{LifecycleEngine, PositionLedger};
use sigbridge_exchange::AdapterRegistry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env 파일이 있으면 로드 (없어도 무방)
    dotenvy::dotenv().ok();

    // SIGBRIDGE_CONFIG가 있으면 그 경로를, 없으면 기본 경로를 사용한다
    let config = match std::env::var("SIGBRIDGE_CONFIG") {
        Ok(path) => AppConfig::load(path)?,
        Err(_) => AppConfig::load_default()?,
    };

    init_logging(&config.logging)?;

    let registry = AdapterRegistry::from_config(&config.exchanges)?;
    if registry.ids().is_empty() {
        warn!("no exchange adapters registered, every signal will be rejected");
    } else {
        info!(exchanges = ?registry.ids(), "exchange adapters ready");
    }

    let ledger = Arc::new(PositionLedger::new());
    let engine = Arc::new(LifecycleEngine::new(
        config.webhook.key,
        ledger.clone(),
        Arc::new(registry),
    ));

    let state = Arc::new(AppState::new(engine, ledger));
    info!(version = %state.version, "application state initialized");

    let app = create_router(state);

    let addr = config.server.socket_addr()?;
    info!(%addr, "webhook server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped gracefully");
    Ok(())
}

/// Graceful shutdown 시그널 대기.
///
/// Ctrl+C 또는 SIGTERM 시그널을 수신하면 종료합니다.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
