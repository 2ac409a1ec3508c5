//! 공통 타입 정의.

pub mod decimal;
pub mod symbol;

pub use decimal::{Price, Quantity};
pub use symbol::Symbol;
