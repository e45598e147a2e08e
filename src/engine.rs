//! Continuous matching engine (C2): a thin wrapper over `OrderBook::add_order`.
//!
//! Never buffers state itself — every call either fills immediately against
//! the resting book or rests the order, and returns the `OrderResult`
//! reflecting exactly that outcome.

use crate::models::{AggressorSide, Order, OrderResult, OrderStatus, Side};
use crate::orderbook::OrderBook;

pub struct ContinuousEngine;

impl ContinuousEngine {
    pub fn submit(book: &mut OrderBook, order: Order) -> OrderResult {
        let order_id = order.order_id;
        let side = order.side;
        let order_type = order.order_type;
        let original_qty = order.quantity;

        let aggressor = match side {
            Side::Buy => AggressorSide::Buy,
            Side::Sell => AggressorSide::Sell,
        };

        let (status, fills, remaining) = book.add_order(order, aggressor);

        // A market order that found no liquidity at all is a business
        // error, not a resting `new` order (spec.md §9 Open Questions).
        if order_type == crate::models::OrderType::Market && fills.is_empty() {
            return OrderResult::rejected(order_id, "NO_LIQUIDITY", "no counter liquidity available");
        }

        let _ = original_qty;
        OrderResult {
            order_id,
            status,
            fills,
            remaining_quantity: remaining,
            error_code: None,
            error_message: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderType;
    use rust_decimal_macros::dec;

    fn limit(id: u64, trader: u64, side: Side, price: rust_decimal::Decimal, qty: u64) -> Order {
        Order::new(id, None, 1, side, OrderType::Limit, qty, Some(price), trader, 0)
    }

    #[test]
    fn crossing_limit_orders_match_at_passive_price() {
        let mut book = OrderBook::new();
        ContinuousEngine::submit(&mut book, limit(1, 1, Side::Sell, dec!(25.00), 10));
        let result = ContinuousEngine::submit(&mut book, limit(2, 2, Side::Buy, dec!(26.00), 5));

        assert_eq!(result.status, OrderStatus::Filled);
        assert_eq!(result.remaining_quantity, 0);
        assert_eq!(result.fills.len(), 1);
        assert_eq!(result.fills[0].price, dec!(25.00));
        assert_eq!(result.fills[0].quantity, 5);

        assert_eq!(book.best_ask().unwrap().quantity, 5);
    }

    #[test]
    fn market_order_with_no_liquidity_is_rejected() {
        let mut book = OrderBook::new();
        let order = Order::new(1, None, 1, Side::Buy, OrderType::Market, 10, None, 1, 0);
        let result = ContinuousEngine::submit(&mut book, order);
        assert_eq!(result.status, OrderStatus::Rejected);
        assert_eq!(result.error_code.as_deref(), Some("NO_LIQUIDITY"));
    }

    #[test]
    fn resting_order_has_new_status() {
        let mut book = OrderBook::new();
        let result = ContinuousEngine::submit(&mut book, limit(1, 1, Side::Buy, dec!(10), 5));
        assert_eq!(result.status, OrderStatus::New);
        assert_eq!(result.fills.len(), 0);
    }
}
