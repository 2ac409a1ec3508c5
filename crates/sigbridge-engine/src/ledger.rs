//! 포지션 원장.
//!
//! 심볼별 포지션 상태의 단일 진실 공급원입니다. 유일한 변경 수단은
//! compare-and-transition이며, 엔진이 결정의 근거로 삼은 상태가
//! 여전히 유효할 때에만 새 상태를 적용합니다.
//!
//! 잠금은 메모리 읽기/쓰기 동안에만 잡힙니다. 네트워크 호출을
//! 잠금 안에서 수행하는 일은 없습니다.

use std::collections::HashMap;
use std::sync::RwLock;

use sigbridge_core::{Position, Symbol};
use tracing::{debug, warn};

/// 심볼 -> 포지션 매핑.
///
/// 프로세스 수명 동안만 유지되는 인메모리 저장소입니다.
/// 싱글턴이 아니라 주입되는 컴포넌트이므로 테스트마다
/// 격리된 인스턴스를 쓸 수 있습니다.
#[derive(Default)]
pub struct PositionLedger {
    positions: RwLock<HashMap<Symbol, Position>>,
}

impl PositionLedger {
    /// 빈 원장 생성.
    pub fn new() -> Self {
        Self::default()
    }

    /// 심볼의 현재 포지션 반환.
    ///
    /// 아직 본 적 없는 심볼은 기본 CLOSED 포지션을 반환합니다.
    /// 실패하지 않습니다.
    pub fn get(&self, symbol: &Symbol) -> Position {
        self.positions
            .read()
            .expect("position ledger lock poisoned")
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| Position::closed(symbol.clone()))
    }

    /// 비교 후 전이.
    ///
    /// 현재 포지션이 `expected`와 (타임스탬프를 제외하고) 일치할 때에만
    /// `next`를 적용하고 `true`를 반환합니다. 다른 요청이 먼저 상태를
    /// 바꿨다면 아무것도 변경하지 않고 `false`를 반환합니다.
    pub fn compare_and_transition(
        &self,
        symbol: &Symbol,
        expected: &Position,
        next: Position,
    ) -> bool {
        debug_assert!(next.invariant_holds(), "next position violates invariant");

        let mut positions = self
            .positions
            .write()
            .expect("position ledger lock poisoned");

        let current = positions
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| Position::closed(symbol.clone()));

        if !current.same_decision_state(expected) {
            warn!(
                %symbol,
                expected_state = %expected.state,
                current_state = %current.state,
                "compare-and-transition lost the race"
            );
            return false;
        }

        debug!(%symbol, state = %next.state, side = %next.side, "position transition committed");
        positions.insert(symbol.clone(), next);
        true
    }

    /// 현재 열려 있는 포지션의 스냅샷.
    pub fn open_positions(&self) -> Vec<Position> {
        self.positions
            .read()
            .expect("position ledger lock poisoned")
            .values()
            .filter(|p| p.is_open())
            .cloned()
            .collect()
    }
}
