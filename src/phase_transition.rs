//! Phase transition handler (C5): a stateful edge detector that fires
//! auction-clear / cancel-all actions exactly once per phase edge.

use crate::models::PhaseType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionAction {
    None,
    RunOpeningAuction,
    CancelAllResting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: Option<PhaseType>,
    pub to: PhaseType,
    pub action: TransitionAction,
}

pub struct PhaseTransitionHandler {
    last_observed: Option<PhaseType>,
}

impl PhaseTransitionHandler {
    pub fn new() -> Self {
        Self { last_observed: None }
    }

    /// Idempotent with respect to repeated identical phase observations:
    /// calling `check` twice in a row with the same phase fires nothing the
    /// second time, even under rapid polling.
    pub fn check(&mut self, current_phase: PhaseType) -> Option<Transition> {
        match self.last_observed {
            None => {
                self.last_observed = Some(current_phase);
                None
            }
            Some(prev) if prev == current_phase => None,
            Some(prev) => {
                self.last_observed = Some(current_phase);
                let action = match (prev, current_phase) {
                    (PhaseType::PreOpen, PhaseType::OpeningAuction) => TransitionAction::RunOpeningAuction,
                    (PhaseType::Continuous, PhaseType::Closed) => TransitionAction::CancelAllResting,
                    _ => TransitionAction::None,
                };
                Some(Transition { from: Some(prev), to: current_phase, action })
            }
        }
    }
}

impl Default for PhaseTransitionHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_call_records_with_no_transition() {
        let mut h = PhaseTransitionHandler::new();
        assert_eq!(h.check(PhaseType::Closed), None);
    }

    #[test]
    fn repeated_identical_phase_is_a_no_op() {
        let mut h = PhaseTransitionHandler::new();
        h.check(PhaseType::PreOpen);
        assert_eq!(h.check(PhaseType::PreOpen), None);
        assert_eq!(h.check(PhaseType::PreOpen), None);
    }

    #[test]
    fn pre_open_to_opening_auction_fires_auction() {
        let mut h = PhaseTransitionHandler::new();
        h.check(PhaseType::PreOpen);
        let t = h.check(PhaseType::OpeningAuction).unwrap();
        assert_eq!(t.action, TransitionAction::RunOpeningAuction);
    }

    #[test]
    fn continuous_to_closed_fires_cancel_all() {
        let mut h = PhaseTransitionHandler::new();
        h.check(PhaseType::Continuous);
        let t = h.check(PhaseType::Closed).unwrap();
        assert_eq!(t.action, TransitionAction::CancelAllResting);
    }

    #[test]
    fn other_transitions_fire_no_action() {
        let mut h = PhaseTransitionHandler::new();
        h.check(PhaseType::OpeningAuction);
        let t = h.check(PhaseType::Continuous).unwrap();
        assert_eq!(t.action, TransitionAction::None);
    }
}
