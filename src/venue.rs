//! Exchange venue (C6): owns the instrument registry, one order book per
//! listed instrument, the continuous and batch engines, the phase manager
//! and transition handler. Routes submit/cancel to the right engine based
//! on the current phase's `execution_style` (spec.md §4.6).

use std::sync::Mutex;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rustc_hash::FxHashMap;

use crate::batch_engine::BatchEngine;
use crate::core_types::{InstrumentId, OrderId, TeamId};
use crate::engine::ContinuousEngine;
use crate::models::{AggressorSide, ExecutionStyle, Instrument, Order, OrderResult, OrderStatus, PhaseType};
use crate::orderbook::OrderBook;
use crate::phase::PhaseManager;
use crate::phase_transition::{PhaseTransitionHandler, TransitionAction};

/// Outcome of one phase-transition check, forwarded to the trade processor
/// so fills produced by an opening auction still flow through fee/position/
/// publish handling exactly like a continuous-mode fill.
pub struct TransitionOutcome {
    pub phase: PhaseType,
    pub action: TransitionAction,
    /// `(instrument_id, OrderResult, team_id)` triples produced by an
    /// auction clear.
    pub batch_results: Vec<(InstrumentId, OrderResult, TeamId)>,
    /// Orders cancelled by a `continuous -> closed` edge (spec.md §4.5
    /// "cancel all resting orders in every book"), so the caller can tell
    /// each owning team its resting order is gone.
    pub cancelled_orders: Vec<(InstrumentId, OrderId, TeamId)>,
}

struct InstrumentState {
    instrument: Instrument,
    book: Mutex<OrderBook>,
    /// Order id -> owning team, so a batch-clear result (which only knows
    /// the order) can be attributed to a team for position/fee processing.
    owners: Mutex<FxHashMap<OrderId, TeamId>>,
}

pub enum CancelError {
    NotFound,
    OwnerMismatch,
    MarketClosed,
    UnknownInstrument,
}

pub struct ExchangeVenue {
    instruments: FxHashMap<InstrumentId, InstrumentState>,
    batch: Mutex<BatchEngine>,
    phase_manager: PhaseManager,
    transition_handler: Mutex<PhaseTransitionHandler>,
    rng: Mutex<StdRng>,
}

impl ExchangeVenue {
    pub fn new(instruments: Vec<Instrument>, phase_manager: PhaseManager) -> Self {
        let instruments = instruments
            .into_iter()
            .map(|i| {
                (
                    i.instrument_id,
                    InstrumentState {
                        instrument: i,
                        book: Mutex::new(OrderBook::new()),
                        owners: Mutex::new(FxHashMap::default()),
                    },
                )
            })
            .collect();
        Self {
            instruments,
            batch: Mutex::new(BatchEngine::new()),
            phase_manager,
            transition_handler: Mutex::new(PhaseTransitionHandler::new()),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Test/deterministic constructor: seeds the batch-clearing RNG instead
    /// of pulling entropy, per spec.md §9 "inject it; do not use a global
    /// default. Tests seed a deterministic generator."
    pub fn with_seed(instruments: Vec<Instrument>, phase_manager: PhaseManager, seed: u64) -> Self {
        let venue = Self::new(instruments, phase_manager);
        *venue.rng.lock().unwrap() = StdRng::seed_from_u64(seed);
        venue
    }

    pub fn instrument(&self, instrument_id: InstrumentId) -> Option<&Instrument> {
        self.instruments.get(&instrument_id).map(|s| &s.instrument)
    }

    pub fn current_phase(&self, now: i64) -> PhaseType {
        self.phase_manager.current_phase(now)
    }

    /// Submit a new order. Rejects with `MARKET_CLOSED` when the current
    /// phase disallows submission; otherwise dispatches to C2 or C3 by
    /// `execution_style`.
    pub fn submit(&self, order: Order, now: i64) -> OrderResult {
        let state = self.phase_manager.current_state(now);
        let Some(instr) = self.instruments.get(&order.instrument_id) else {
            return OrderResult::rejected(order.order_id, "UNKNOWN_INSTRUMENT", "instrument not listed");
        };
        if !state.submission_allowed {
            return OrderResult::rejected(order.order_id, "MARKET_CLOSED", "submissions not allowed in this phase");
        }

        instr.owners.lock().unwrap().insert(order.order_id, order.trader_id);

        match state.execution_style {
            ExecutionStyle::Continuous => {
                let mut book = instr.book.lock().unwrap();
                ContinuousEngine::submit(&mut book, order)
            }
            ExecutionStyle::Batch => {
                let mut batch = self.batch.lock().unwrap();
                batch.submit(order)
            }
            ExecutionStyle::None => {
                OrderResult::rejected(order.order_id, "MARKET_CLOSED", "no matching discipline active in this phase")
            }
        }
    }

    /// Cancel a resting or pending order. `CancelError::OwnerMismatch` is a
    /// hard fault per spec.md §4.1, but the caller API only ever surfaces
    /// the generic `CANCEL_FAILED` (spec.md §6) so other teams' order
    /// existence is never leaked.
    pub fn cancel(
        &self,
        instrument_id: InstrumentId,
        order_id: OrderId,
        trader_id: TeamId,
        now: i64,
    ) -> Result<(), CancelError> {
        let state = self.phase_manager.current_state(now);
        let Some(instr) = self.instruments.get(&instrument_id) else {
            return Err(CancelError::UnknownInstrument);
        };
        if !state.cancellation_allowed {
            return Err(CancelError::MarketClosed);
        }

        let book_result = {
            let mut book = instr.book.lock().unwrap();
            book.cancel(order_id, trader_id)
        };
        match book_result {
            Ok(()) => return Ok(()),
            Err(true) => return Err(CancelError::OwnerMismatch),
            Err(false) => {}
        }

        let mut batch = self.batch.lock().unwrap();
        match batch.cancel(instrument_id, order_id, trader_id) {
            Ok(()) => Ok(()),
            Err(true) => Err(CancelError::OwnerMismatch),
            Err(false) => Err(CancelError::NotFound),
        }
    }

    pub fn depth_snapshot(&self, instrument_id: InstrumentId) -> Option<crate::orderbook::DepthSnapshot> {
        self.instruments.get(&instrument_id).map(|s| s.book.lock().unwrap().depth_snapshot())
    }

    /// Entry point driven by C9 at a ≤100 ms cadence (spec.md §4.9). Reads
    /// the current phase, forwards it to the transition handler, and fires
    /// whatever action the edge calls for across every listed instrument.
    pub fn check_phase_transitions(&self, now: i64) -> Option<TransitionOutcome> {
        let phase = self.phase_manager.current_phase(now);
        let transition = self.transition_handler.lock().unwrap().check(phase)?;

        let mut batch_results = Vec::new();
        let mut cancelled_orders = Vec::new();
        match transition.action {
            TransitionAction::RunOpeningAuction => {
                let mut batch = self.batch.lock().unwrap();
                let mut rng = self.rng.lock().unwrap();
                for (&instrument_id, state) in &self.instruments {
                    let mut book = state.book.lock().unwrap();
                    let results = batch.execute_batch(instrument_id, &mut book, &mut *rng);
                    let owners = state.owners.lock().unwrap();
                    for result in results {
                        let team_id = owners.get(&result.order_id).copied().unwrap_or(0);
                        batch_results.push((instrument_id, result, team_id));
                    }
                }
            }
            TransitionAction::CancelAllResting => {
                for (&instrument_id, state) in &self.instruments {
                    let owners = state.owners.lock().unwrap();
                    let mut book = state.book.lock().unwrap();
                    for order_id in book.cancel_all() {
                        if let Some(&team_id) = owners.get(&order_id) {
                            cancelled_orders.push((instrument_id, order_id, team_id));
                        }
                    }
                }
            }
            TransitionAction::None => {}
        }

        Some(TransitionOutcome { phase, action: transition.action, batch_results, cancelled_orders })
    }
}

/// Maps a venue cancel outcome to the stable caller-facing error code.
/// spec.md §6: "Exposing richer failure reasons is forbidden."
pub fn cancel_error_code(_err: &CancelError) -> (&'static str, &'static str) {
    ("CANCEL_FAILED", "order not found")
}

#[allow(dead_code)]
fn _status_is_terminal(s: OrderStatus) -> bool {
    matches!(s, OrderStatus::Filled | OrderStatus::Rejected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderType;
    use crate::phase::PhaseConfig;
    use rust_decimal_macros::dec;

    fn instrument() -> Instrument {
        Instrument {
            instrument_id: 1,
            symbol: "XYZ-100C".into(),
            underlying: "XYZ".into(),
            strike: dec!(100),
            expiry: "2026-12-18".into(),
            option_type: "call".into(),
        }
    }

    fn always_continuous() -> PhaseManager {
        let yaml = r#"
timezone_offset_minutes: 0
schedule:
  - phase: continuous
    start: { hour: 0, minute: 0 }
    end: { hour: 23, minute: 59 }
    weekdays: [1,2,3,4,5,6,7]
capabilities:
  continuous:
    submission_allowed: true
    cancellation_allowed: true
    matching_enabled: true
    execution_style: continuous
"#;
        let cfg: PhaseConfig = serde_yaml::from_str(yaml).unwrap();
        PhaseManager::from_config(&cfg).unwrap()
    }

    fn order(id: OrderId, trader: TeamId, side: crate::models::Side, price: rust_decimal::Decimal, qty: u64) -> Order {
        Order::new(id, None, 1, side, OrderType::Limit, qty, Some(price), trader, 0)
    }

    #[test]
    fn submit_to_unknown_instrument_is_rejected() {
        let venue = ExchangeVenue::new(vec![instrument()], always_continuous());
        let o = order(1, 1, crate::models::Side::Buy, dec!(100), 1);
        let mut bad = o.clone();
        bad.instrument_id = 999;
        let result = venue.submit(bad, 0);
        assert_eq!(result.error_code.as_deref(), Some("UNKNOWN_INSTRUMENT"));
    }

    #[test]
    fn crossing_orders_match_through_the_venue() {
        let venue = ExchangeVenue::new(vec![instrument()], always_continuous());
        venue.submit(order(1, 1, crate::models::Side::Sell, dec!(25), 10), 0);
        let r = venue.submit(order(2, 2, crate::models::Side::Buy, dec!(26), 5), 0);
        assert_eq!(r.status, OrderStatus::Filled);
    }

    #[test]
    fn cancel_owner_mismatch_never_reveals_richer_reason() {
        let venue = ExchangeVenue::new(vec![instrument()], always_continuous());
        venue.submit(order(1, 1, crate::models::Side::Buy, dec!(99), 10), 0);
        let err = venue.cancel(1, 1, 999, 0).unwrap_err();
        let (code, msg) = cancel_error_code(&err);
        assert_eq!(code, "CANCEL_FAILED");
        assert_eq!(msg, "order not found");
    }
}
