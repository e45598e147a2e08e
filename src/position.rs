//! Position service (C11): per-team, per-instrument signed quantities.

use std::sync::Mutex;

use rustc_hash::FxHashMap;

use crate::core_types::{InstrumentId, TeamId};
use crate::models::Side;

#[derive(Default)]
struct Positions {
    by_team: FxHashMap<TeamId, FxHashMap<InstrumentId, i64>>,
}

/// Mutex-guarded, like the other shared per-key stores (spec.md §5 lists
/// the position map among the mutexes with a fixed acquisition order).
pub struct PositionService {
    inner: Mutex<Positions>,
}

impl PositionService {
    pub fn new() -> Self {
        Self { inner: Mutex::new(Positions::default()) }
    }

    /// Apply a trade's signed quantity to a team's position in one
    /// instrument. Buys increase it, sells decrease it.
    pub fn apply_fill(&self, team_id: TeamId, instrument_id: InstrumentId, side: Side, quantity: u64) {
        let mut guard = self.inner.lock().unwrap();
        let entry = guard.by_team.entry(team_id).or_default().entry(instrument_id).or_insert(0);
        *entry += quantity as i64 * side.sign();
    }

    pub fn position(&self, team_id: TeamId, instrument_id: InstrumentId) -> i64 {
        let guard = self.inner.lock().unwrap();
        guard
            .by_team
            .get(&team_id)
            .and_then(|m| m.get(&instrument_id))
            .copied()
            .unwrap_or(0)
    }

    /// All of a team's non-zero positions, for portfolio-limit checks and
    /// the query-positions caller API.
    pub fn positions_for(&self, team_id: TeamId) -> Vec<(InstrumentId, i64)> {
        let guard = self.inner.lock().unwrap();
        guard
            .by_team
            .get(&team_id)
            .map(|m| m.iter().map(|(k, v)| (*k, *v)).collect())
            .unwrap_or_default()
    }
}

impl Default for PositionService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buy_and_sell_move_position_in_opposite_directions() {
        let svc = PositionService::new();
        svc.apply_fill(1, 10, Side::Buy, 5);
        svc.apply_fill(1, 10, Side::Sell, 2);
        assert_eq!(svc.position(1, 10), 3);
    }

    #[test]
    fn counterparties_of_one_trade_sum_to_zero() {
        let svc = PositionService::new();
        svc.apply_fill(1, 10, Side::Buy, 7);
        svc.apply_fill(2, 10, Side::Sell, 7);
        assert_eq!(svc.position(1, 10) + svc.position(2, 10), 0);
    }

    #[test]
    fn unknown_team_or_instrument_defaults_to_zero() {
        let svc = PositionService::new();
        assert_eq!(svc.position(999, 1), 0);
    }
}
