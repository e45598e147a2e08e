//! Response coordinator (C13): turns the asynchronous pipeline's eventual
//! completion back into a synchronous result a caller thread can block on.
//! The densest and most delicate component per spec.md §4.13 — read that
//! section before touching this file.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use serde::Serialize;

use crate::core_types::{OrderId, RequestId, TeamId};
use crate::error::CoreFault;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Pending,
    Validating,
    Matching,
    Settling,
    Completed,
    Error,
    Timeout,
}

impl RequestStatus {
    fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Error | RequestStatus::Timeout)
    }
}

/// The caller-facing payload stored at completion. Shaped like spec.md §6's
/// "response envelope": a success flag, the request id, an order id on
/// success, and a machine-readable error code/message on failure.
#[derive(Debug, Clone, Serialize)]
pub struct ApiOutcome {
    pub success: bool,
    pub request_id: RequestId,
    pub order_id: Option<OrderId>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    #[serde(skip)]
    pub filled_quantity: u64,
    #[serde(skip)]
    pub average_price: Option<rust_decimal::Decimal>,
    #[serde(skip)]
    pub net_fees: rust_decimal::Decimal,
    #[serde(skip)]
    pub liquidity_type: Option<crate::models::LiquidityType>,
}

impl ApiOutcome {
    pub fn failure(request_id: RequestId, error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            request_id,
            order_id: None,
            error_code: Some(error_code.into()),
            error_message: Some(message.into()),
            filled_quantity: 0,
            average_price: None,
            net_fees: rust_decimal::Decimal::ZERO,
            liquidity_type: None,
        }
    }
}

struct PendingRequest {
    team_id: TeamId,
    status: RequestStatus,
    timeout_at: i64,
    result: Option<ApiOutcome>,
    completed_at: Option<i64>,
}

struct Shared {
    table: Mutex<HashMap<RequestId, PendingRequest>>,
    condvar: Condvar,
    next_id: AtomicU64,
    shutting_down: Mutex<bool>,
}

pub struct Registration {
    pub request_id: RequestId,
    pub timeout_at: i64,
}

#[derive(Debug)]
pub enum RegisterError {
    CapacityExhausted,
}

pub struct ResponseCoordinator {
    shared: Arc<Shared>,
    max_pending: usize,
    grace_seconds: i64,
    cleanup: Mutex<Option<JoinHandle<()>>>,
}

impl ResponseCoordinator {
    pub fn new(max_pending: usize, grace_seconds: i64, cleanup_interval_seconds: u64) -> Arc<Self> {
        let shared = Arc::new(Shared {
            table: Mutex::new(HashMap::new()),
            condvar: Condvar::new(),
            next_id: AtomicU64::new(0),
            shutting_down: Mutex::new(false),
        });

        let coordinator = Arc::new(Self { shared: shared.clone(), max_pending, grace_seconds, cleanup: Mutex::new(None) });

        let cleanup_shared = shared.clone();
        let handle = std::thread::spawn(move || {
            loop {
                std::thread::sleep(Duration::from_secs(cleanup_interval_seconds.max(1)));
                if *cleanup_shared.shutting_down.lock().unwrap() {
                    return;
                }
                Self::sweep(&cleanup_shared, grace_seconds, Self::wall_clock_now());
            }
        });
        *coordinator.cleanup.lock().unwrap() = Some(handle);
        coordinator
    }

    fn wall_clock_now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    /// Assign a fresh, never-reused request id and a pending slot. Fails
    /// with `CapacityExhausted` when the table is already at capacity — the
    /// counter itself is never rolled back, so a failed register never
    /// reissues an id (spec.md §4.13's uniqueness property, S6).
    pub fn register(&self, team_id: TeamId, timeout_seconds: u64, now: i64) -> Result<Registration, RegisterError> {
        let mut table = self.shared.table.lock().unwrap();
        // Capacity counts requests still in flight. A completed/timed-out
        // request stops counting against the cap the moment it terminalizes
        // — it lingers in the table only for a late waiter or the grace
        // sweep, per spec.md §4.13's lifecycle (S6: capacity recovers as
        // soon as a request completes, not only after cleanup runs).
        let in_flight = table.values().filter(|r| !r.status.is_terminal()).count();
        if in_flight >= self.max_pending {
            return Err(RegisterError::CapacityExhausted);
        }
        let request_id = self.shared.next_id.fetch_add(1, Ordering::SeqCst);
        let timeout_at = now + timeout_seconds as i64;
        table.insert(
            request_id,
            PendingRequest { team_id, status: RequestStatus::Pending, timeout_at, result: None, completed_at: None },
        );
        Ok(Registration { request_id, timeout_at })
    }

    /// No-ops silently for an unknown id: a status update racing cleanup of
    /// an already-terminal/evicted request must never panic or error.
    pub fn update_status(&self, request_id: RequestId, status: RequestStatus) {
        let mut table = self.shared.table.lock().unwrap();
        if let Some(req) = table.get_mut(&request_id) {
            if !req.status.is_terminal() {
                req.status = status;
            }
        }
    }

    /// Stores the result and wakes waiters exactly once. A second call for
    /// an already-terminal request is a silent no-op (spec.md §7
    /// idempotency: "completion notification for an already-terminal
    /// request is discarded").
    pub fn notify_completion(&self, request_id: RequestId, outcome: ApiOutcome, now: i64) {
        let mut table = self.shared.table.lock().unwrap();
        if let Some(req) = table.get_mut(&request_id) {
            if req.status.is_terminal() {
                return;
            }
            req.status = if outcome.success { RequestStatus::Completed } else { RequestStatus::Error };
            req.result = Some(outcome);
            req.completed_at = Some(now);
            self.shared.condvar.notify_all();
        }
        // Unknown id: the request already timed out and was reclaimed by a
        // caller or the cleanup sweep. Discard per spec.md §5 "Cancellation
        // semantics" — the pipeline continues to completion regardless, but
        // the result is simply dropped.
    }

    /// Blocks until completion or `timeout`. On timeout, synthesizes a
    /// timeout outcome and terminalizes the request so a later completion
    /// cannot orphan resources or double-notify.
    pub fn wait_for_completion(&self, request_id: RequestId, timeout: Duration) -> ApiOutcome {
        let mut table = self.shared.table.lock().unwrap();
        loop {
            match table.get(&request_id) {
                None => {
                    return ApiOutcome::failure(request_id, "INTERNAL_ERROR", "unknown request id");
                }
                Some(req) if req.status.is_terminal() => {
                    return req
                        .result
                        .clone()
                        .unwrap_or_else(|| panic!("{}", CoreFault::CompletionWithoutResult(request_id)));
                }
                Some(_) => {}
            }

            let (guard, timeout_result) =
                self.shared.condvar.wait_timeout(table, timeout).unwrap();
            table = guard;
            if timeout_result.timed_out() {
                if let Some(req) = table.get_mut(&request_id) {
                    if !req.status.is_terminal() {
                        let timeout_outcome =
                            ApiOutcome::failure(request_id, "PROCESSING_TIMEOUT", "pipeline did not complete in time");
                        req.status = RequestStatus::Timeout;
                        req.result = Some(timeout_outcome.clone());
                        req.completed_at = Some(Self::wall_clock_now());
                        return timeout_outcome;
                    }
                    return req
                        .result
                        .clone()
                        .unwrap_or_else(|| panic!("{}", CoreFault::CompletionWithoutResult(request_id)));
                }
                return ApiOutcome::failure(request_id, "INTERNAL_ERROR", "unknown request id");
            }
        }
    }

    fn sweep(shared: &Shared, grace_seconds: i64, now: i64) {
        let mut table = shared.table.lock().unwrap();
        let mut woke_any = false;
        table.retain(|_, req| {
            if !req.status.is_terminal() && req.timeout_at <= now {
                req.status = RequestStatus::Timeout;
                req.result = Some(ApiOutcome::failure(0, "PROCESSING_TIMEOUT", "pipeline did not complete in time"));
                req.completed_at = Some(now);
                woke_any = true;
                return true;
            }
            match req.completed_at {
                Some(at) if now - at > grace_seconds => false,
                _ => true,
            }
        });
        if woke_any {
            shared.condvar.notify_all();
        }
    }

    /// Wakes every waiter with a shutdown-flavored timeout result and joins
    /// the cleanup thread.
    pub fn shutdown(&self) {
        *self.shared.shutting_down.lock().unwrap() = true;
        {
            let mut table = self.shared.table.lock().unwrap();
            for req in table.values_mut() {
                if !req.status.is_terminal() {
                    req.status = RequestStatus::Timeout;
                    req.result = Some(ApiOutcome::failure(0, "SERVICE_OVERLOADED", "coordinator shutting down"));
                }
            }
            self.shared.condvar.notify_all();
        }
        if let Some(handle) = self.cleanup.lock().unwrap().take() {
            let _ = handle.join();
        }
    }

    pub fn pending_count(&self) -> usize {
        self.shared.table.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_notify_unblocks_waiter() {
        let coordinator = ResponseCoordinator::new(10, 60, 3600);
        let reg = coordinator.register(1, 5, 0).unwrap();
        let outcome = ApiOutcome { success: true, request_id: reg.request_id, order_id: Some(42), error_code: None, error_message: None, filled_quantity: 0, average_price: None, net_fees: rust_decimal::Decimal::ZERO, liquidity_type: None };
        coordinator.notify_completion(reg.request_id, outcome, 0);
        let result = coordinator.wait_for_completion(reg.request_id, Duration::from_secs(1));
        assert!(result.success);
        assert_eq!(result.order_id, Some(42));
        coordinator.shutdown();
    }

    #[test]
    fn wait_times_out_when_nothing_completes() {
        let coordinator = ResponseCoordinator::new(10, 60, 3600);
        let reg = coordinator.register(1, 5, 0).unwrap();
        let result = coordinator.wait_for_completion(reg.request_id, Duration::from_millis(50));
        assert!(!result.success);
        assert_eq!(result.error_code.as_deref(), Some("PROCESSING_TIMEOUT"));
        coordinator.shutdown();
    }

    #[test]
    fn second_completion_after_timeout_is_a_silent_no_op() {
        let coordinator = ResponseCoordinator::new(10, 60, 3600);
        let reg = coordinator.register(1, 5, 0).unwrap();
        let _ = coordinator.wait_for_completion(reg.request_id, Duration::from_millis(20));
        let late = ApiOutcome { success: true, request_id: reg.request_id, order_id: Some(7), error_code: None, error_message: None, filled_quantity: 0, average_price: None, net_fees: rust_decimal::Decimal::ZERO, liquidity_type: None };
        coordinator.notify_completion(reg.request_id, late, 100);
        // Does not panic, and does not resurrect the request.
        coordinator.shutdown();
    }

    #[test]
    fn request_ids_are_never_reused_after_capacity_recovery() {
        // S6: register 5 (ids 0..4), complete 1/2/3, register 3 more ->
        // 5, 6, 7 — never reissued from the freed range.
        let coordinator = ResponseCoordinator::new(5, 60, 3600);
        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(coordinator.register(1, 5, 0).unwrap().request_id);
        }
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
        assert!(matches!(coordinator.register(1, 5, 0), Err(RegisterError::CapacityExhausted)));

        for &id in &ids[1..4] {
            coordinator.notify_completion(
                id,
                ApiOutcome { success: true, request_id: id, order_id: None, error_code: None, error_message: None, filled_quantity: 0, average_price: None, net_fees: rust_decimal::Decimal::ZERO, liquidity_type: None },
                0,
            );
        }

        let mut new_ids = Vec::new();
        for _ in 0..3 {
            new_ids.push(coordinator.register(1, 5, 0).unwrap().request_id);
        }
        assert_eq!(new_ids, vec![5, 6, 7]);

        let mut all: Vec<_> = ids.into_iter().chain(new_ids).collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 8, "all 8 request ids must be distinct");
        coordinator.shutdown();
    }
}
