//! # Sigbridge Core
//!
//! 웹훅 트레이딩 브릿지의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 시스템 전반에서 사용되는 기본 타입을 제공합니다:
//! - 인바운드 시그널 및 액션 정의
//! - 심볼별 포지션 상태 모델
//! - 주문 방향/유형 정의
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod logging;
pub mod types;

pub use config::*;
pub use domain::*;
pub use logging::*;
pub use types::*;
