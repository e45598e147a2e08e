//! Order, trade, and phase data model shared by every component.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core_types::{InstrumentId, OrderId, TeamId, TradeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Signed multiplier for position deltas: +1 for buy, -1 for sell.
    pub fn sign(self) -> i64 {
        match self {
            Side::Buy => 1,
            Side::Sell => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Limit,
    Market,
}

/// An order as it flows through the pipeline. `remaining_quantity` is
/// mutated in place by the engines; it never increases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub client_order_id: Option<String>,
    pub instrument_id: InstrumentId,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: u64,
    pub remaining_quantity: u64,
    /// Absent iff `order_type == Market`.
    pub price: Option<Decimal>,
    pub trader_id: TeamId,
    pub timestamp: i64,
}

impl Order {
    pub fn new(
        order_id: OrderId,
        client_order_id: Option<String>,
        instrument_id: InstrumentId,
        side: Side,
        order_type: OrderType,
        quantity: u64,
        price: Option<Decimal>,
        trader_id: TeamId,
        timestamp: i64,
    ) -> Self {
        Self {
            order_id,
            client_order_id,
            instrument_id,
            side,
            order_type,
            quantity,
            remaining_quantity: quantity,
            price,
            trader_id,
            timestamp,
        }
    }

    pub fn is_filled(&self) -> bool {
        self.remaining_quantity == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggressorSide {
    Buy,
    Sell,
    /// Batch/auction fills have no aggressor.
    None,
}

/// Immutable trade record. Created only by a matching engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: TradeId,
    pub instrument_id: InstrumentId,
    pub buyer_id: TeamId,
    pub seller_id: TeamId,
    pub buyer_order_id: OrderId,
    pub seller_order_id: OrderId,
    pub price: Decimal,
    pub quantity: u64,
    pub aggressor_side: AggressorSide,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    PendingNew,
    Rejected,
}

/// Engine output for one submit or cancel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResult {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub fills: Vec<Trade>,
    pub remaining_quantity: u64,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

impl OrderResult {
    pub fn rejected(order_id: OrderId, error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            order_id,
            status: OrderStatus::Rejected,
            fills: Vec::new(),
            remaining_quantity: 0,
            error_code: Some(error_code.into()),
            error_message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PhaseType {
    Closed,
    PreOpen,
    OpeningAuction,
    Continuous,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStyle {
    None,
    Batch,
    Continuous,
}

/// Capability flags for a market phase (spec.md §3 "Phase state").
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PhaseState {
    pub phase_type: PhaseType,
    pub submission_allowed: bool,
    pub cancellation_allowed: bool,
    pub matching_enabled: bool,
    pub execution_style: ExecutionStyle,
}

/// A listed instrument. Only `symbol` and `instrument_id` affect matching;
/// the rest are descriptive fields used for display (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    pub instrument_id: InstrumentId,
    pub symbol: String,
    pub underlying: String,
    pub strike: Decimal,
    pub expiry: String,
    pub option_type: String,
}

/// A trading participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub team_id: TeamId,
    pub role: String,
}

/// Liquidity classification used by the trade processor and fee service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiquidityType {
    Maker,
    Taker,
    Mixed,
}
