//! Caller-facing request bodies (spec.md §6 "Caller API").

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::core_types::{InstrumentId, OrderId, TeamId};
use crate::models::{Order, OrderType, Side};

#[derive(Debug, Clone, Deserialize)]
pub struct NewOrderRequest {
    pub team_id: TeamId,
    pub role: String,
    pub instrument_id: InstrumentId,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: u64,
    /// Required iff `order_type == Limit`; checked by the gateway handler
    /// before registration (spec.md §7 input errors never enter the pipeline).
    pub price: Option<Decimal>,
    pub client_order_id: Option<String>,
}

impl NewOrderRequest {
    pub fn into_order(self, order_id: OrderId, timestamp: i64) -> Order {
        Order::new(
            order_id,
            self.client_order_id,
            self.instrument_id,
            self.side,
            self.order_type,
            self.quantity,
            self.price,
            self.team_id,
            timestamp,
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancelOrderRequest {
    pub team_id: TeamId,
    pub instrument_id: InstrumentId,
    pub order_id: OrderId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PositionsQuery {
    pub team_id: TeamId,
}
