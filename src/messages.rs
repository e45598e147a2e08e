//! Inter-service message types passed between C8 (validation), C9
//! (matching), C10 (trade processor) and C14 (event publisher) over the
//! bounded channels described in spec.md §5.

use crate::core_types::{InstrumentId, OrderId, RequestId, SeqNum, TeamId, TradeId};
use crate::models::{LiquidityType, Order, OrderResult, PhaseType};

/// A team's submission, as it enters the intake queue (C8). Tagged union
/// per spec.md §4.8. Workers shut down on the channel closing (the sender
/// side is dropped) rather than on an in-band sentinel value, per spec.md
/// §9's closed-channel design note.
#[derive(Debug, Clone)]
pub enum IntakeMessage {
    NewOrder { order: Order, role: String, request_id: RequestId },
    CancelOrder {
        instrument_id: InstrumentId,
        order_id: OrderId,
        team_id: TeamId,
        request_id: RequestId,
    },
}

/// Handed from C8 to C9 once a new order clears validation. `order.trader_id`
/// is the owning team; role is looked up from the team directory by C10
/// rather than threaded through here.
#[derive(Debug, Clone)]
pub struct MatchJob {
    pub order: Order,
    pub request_id: RequestId,
}

/// Handed from C9 to C10: the engine's verdict plus enough team context to
/// compute fees, update positions, and publish events. `request_id` is
/// `None` when the fill did not originate from a live pending request —
/// the passive side of a continuous match, or any order released by an
/// auction clear (whose own submit request already completed with
/// `pending_new` at intake time).
#[derive(Debug, Clone)]
pub struct SettleJob {
    pub result: OrderResult,
    pub instrument_id: InstrumentId,
    pub team_id: TeamId,
    pub request_id: Option<RequestId>,
}

/// `{type, seq, timestamp, data}` push envelope (spec.md §6 "Event
/// stream"). `seq` and `timestamp` are stamped by the publisher at send
/// time, never by the producer, so ordering is enforced in one place.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventData {
    PositionSnapshot { positions: Vec<(InstrumentId, i64)> },
    NewOrderAck { order_id: OrderId, instrument_id: InstrumentId },
    NewOrderReject { order_id: Option<OrderId>, error_code: String, message: String },
    ExecutionReport {
        order_id: OrderId,
        trade_id: TradeId,
        instrument_id: InstrumentId,
        price: rust_decimal::Decimal,
        quantity: u64,
        liquidity_type: LiquidityType,
        fee: rust_decimal::Decimal,
    },
    CancelAck { order_id: OrderId },
    CancelReject { order_id: OrderId, error_code: String, message: String },
    PhaseChanged { phase: PhaseType },
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Event {
    pub seq: SeqNum,
    pub timestamp: i64,
    #[serde(flatten)]
    pub data: EventData,
}
