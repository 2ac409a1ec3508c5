//! 도메인 모델.

pub mod order;
pub mod position;
pub mod signal;

pub use order::{OrderType, Side};
pub use position::{Position, PositionSide, PositionState};
pub use signal::{Signal, SignalAction, SignalPayload};
