//! 정밀한 금융 계산을 위한 Decimal 타입 별칭.
//!
//! 수량과 가격은 항상 `rust_decimal::Decimal`로 다룹니다.
//! 부동소수점(f64)은 주문 경로에서 사용하지 않습니다.

use rust_decimal::Decimal;

/// 금융 정밀도를 위한 가격 타입.
pub type Price = Decimal;

/// 주문 수량을 위한 타입.
pub type Quantity = Decimal;
