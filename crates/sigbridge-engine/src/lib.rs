//! # Sigbridge Engine
//!
//! 주문 라이프사이클 엔진 구현입니다.
//!
//! - [`SignalValidator`] - 원시 웹훅 본문을 정규화된 신호로 검증
//! - [`PositionLedger`] - 심볼별 포지션 상태의 단일 진실 공급원
//! - [`LifecycleEngine`] - 상태 전이 판정, 거래소 호출, 원장 커밋
//!
//! 엔진은 read → decide → call → compare-and-commit 순서로 동작하며,
//! 네트워크 호출 중에는 어떤 원장 잠금도 잡지 않습니다.

pub mod engine;
pub mod error;
pub mod ledger;
pub mod validator;

pub use engine::{Execution, LifecycleEngine};
pub use error::EngineError;
pub use ledger::PositionLedger;
pub use validator::SignalValidator;
