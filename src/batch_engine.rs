//! Batch / auction matching engine (C3): collect-then-clear, with uniform
//! random tie-break among equal-priced orders so no participant gets a
//! timing advantage within a price level.

use rand::Rng;
use rustc_hash::FxHashMap;

use crate::core_types::InstrumentId;
use crate::models::{AggressorSide, Order, OrderResult, OrderStatus, Side};
use crate::orderbook::OrderBook;

#[derive(Default)]
pub struct BatchEngine {
    pool: FxHashMap<InstrumentId, Vec<Order>>,
}

impl BatchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue an order into the pool for its instrument. No book
    /// interaction, no fills — the caller always gets `pending_new`.
    pub fn submit(&mut self, order: Order) -> OrderResult {
        let order_id = order.order_id;
        let remaining = order.remaining_quantity;
        self.pool.entry(order.instrument_id).or_default().push(order);
        OrderResult {
            order_id,
            status: OrderStatus::PendingNew,
            fills: Vec::new(),
            remaining_quantity: remaining,
            error_code: None,
            error_message: None,
        }
    }

    /// Remove a pending order from the pool if present and owned by
    /// `trader_id`. Mirrors `OrderBook::cancel`'s error shape.
    pub fn cancel(
        &mut self,
        instrument_id: InstrumentId,
        order_id: crate::core_types::OrderId,
        trader_id: crate::core_types::TeamId,
    ) -> Result<(), bool> {
        let Some(orders) = self.pool.get_mut(&instrument_id) else {
            return Err(false);
        };
        match orders.iter().position(|o| o.order_id == order_id) {
            Some(pos) if orders[pos].trader_id == trader_id => {
                orders.remove(pos);
                Ok(())
            }
            Some(_) => Err(true),
            None => Err(false),
        }
    }

    /// Clear the pool for one instrument against its book. Orders that do
    /// not clear (including the entire pool, when no price yields positive
    /// volume) are released into the book via `OrderBook::add_order`. A
    /// snapshot (the drained `Vec`) is used for the clearing pass itself so
    /// a concurrent cancel observes the pool as present-or-absent relative
    /// to this call, never a partial view of it.
    pub fn execute_batch(
        &mut self,
        instrument_id: InstrumentId,
        book: &mut OrderBook,
        rng: &mut impl Rng,
    ) -> Vec<OrderResult> {
        let orders = self.pool.remove(&instrument_id).unwrap_or_default();
        if orders.is_empty() {
            return Vec::new();
        }

        let (mut buys, mut sells): (Vec<Order>, Vec<Order>) =
            orders.into_iter().partition(|o| o.side == Side::Buy);

        // Price-then-uniform-random ordering: strict price priority, fair
        // shuffling within a level.
        let buy_keys: FxHashMap<u64, f64> = buys.iter().map(|o| (o.order_id, rng.gen())).collect();
        let sell_keys: FxHashMap<u64, f64> = sells.iter().map(|o| (o.order_id, rng.gen())).collect();
        buys.sort_by(|a, b| {
            b.price.cmp(&a.price).then_with(|| {
                buy_keys[&a.order_id].partial_cmp(&buy_keys[&b.order_id]).unwrap()
            })
        });
        sells.sort_by(|a, b| {
            a.price.cmp(&b.price).then_with(|| {
                sell_keys[&a.order_id].partial_cmp(&sell_keys[&b.order_id]).unwrap()
            })
        });

        let clearing_price = Self::clearing_price(&buys, &sells);

        let mut results = Vec::with_capacity(buys.len() + sells.len());

        let Some(price) = clearing_price else {
            // No price yields positive volume: release everything as-is.
            for order in buys.into_iter().chain(sells) {
                results.push(Self::release(book, order));
            }
            return results;
        };

        let mut trades_by_order: FxHashMap<crate::core_types::OrderId, Vec<crate::models::Trade>> =
            FxHashMap::default();
        let mut trade_id = 0u64;

        let mut bi = 0;
        let mut si = 0;
        while bi < buys.len() && si < sells.len() {
            let buy = &mut buys[bi];
            let sell = &mut sells[si];
            if buy.price.unwrap() < sell.price.unwrap() {
                break;
            }
            let qty = buy.remaining_quantity.min(sell.remaining_quantity);
            if qty == 0 {
                break;
            }
            trade_id += 1;
            let trade = crate::models::Trade {
                trade_id,
                instrument_id,
                buyer_id: buy.trader_id,
                seller_id: sell.trader_id,
                buyer_order_id: buy.order_id,
                seller_order_id: sell.order_id,
                price,
                quantity: qty,
                aggressor_side: AggressorSide::None,
                timestamp: buy.timestamp.max(sell.timestamp),
            };
            buy.remaining_quantity -= qty;
            sell.remaining_quantity -= qty;
            trades_by_order.entry(buy.order_id).or_default().push(trade.clone());
            trades_by_order.entry(sell.order_id).or_default().push(trade);

            if buy.remaining_quantity == 0 {
                bi += 1;
            }
            if sell.remaining_quantity == 0 {
                si += 1;
            }
        }

        for order in buys.into_iter().chain(sells) {
            let fills = trades_by_order.remove(&order.order_id).unwrap_or_default();
            let remaining = order.remaining_quantity;
            let status = if remaining == 0 {
                OrderStatus::Filled
            } else if !fills.is_empty() {
                OrderStatus::PartiallyFilled
            } else {
                OrderStatus::New
            };
            let order_id = order.order_id;
            if remaining > 0 {
                let (rel_status, rel_fills, rel_remaining) =
                    book.add_order(order, AggressorSide::None);
                let mut all_fills = fills;
                all_fills.extend(rel_fills);
                let final_status = if rel_remaining == 0 && !all_fills.is_empty() {
                    OrderStatus::Filled
                } else if !all_fills.is_empty() {
                    OrderStatus::PartiallyFilled
                } else {
                    rel_status
                };
                results.push(OrderResult {
                    order_id,
                    status: final_status,
                    fills: all_fills,
                    remaining_quantity: rel_remaining,
                    error_code: None,
                    error_message: None,
                });
            } else {
                results.push(OrderResult {
                    order_id,
                    status,
                    fills,
                    remaining_quantity: 0,
                    error_code: None,
                    error_message: None,
                });
            }
        }

        results
    }

    fn release(book: &mut OrderBook, order: Order) -> OrderResult {
        let order_id = order.order_id;
        let (status, fills, remaining) = book.add_order(order, AggressorSide::None);
        OrderResult {
            order_id,
            status,
            fills,
            remaining_quantity: remaining,
            error_code: None,
            error_message: None,
        }
    }

    /// Maximum-volume rule: pick the price (or midpoint of a tied
    /// contiguous range) that maximizes executable volume. `None` when no
    /// price yields positive volume.
    fn clearing_price(
        buys: &[Order],
        sells: &[Order],
    ) -> Option<rust_decimal::Decimal> {
        use std::collections::BTreeSet;

        let mut candidates = BTreeSet::new();
        for o in buys.iter().chain(sells) {
            if let Some(p) = o.price {
                candidates.insert(p);
            }
        }
        if candidates.is_empty() {
            return None;
        }
        let candidates: Vec<_> = candidates.into_iter().collect();

        let buy_volume_at = |p: rust_decimal::Decimal| -> u64 {
            buys.iter().filter(|o| o.price.unwrap() >= p).map(|o| o.remaining_quantity).sum()
        };
        let sell_volume_at = |p: rust_decimal::Decimal| -> u64 {
            sells.iter().filter(|o| o.price.unwrap() <= p).map(|o| o.remaining_quantity).sum()
        };

        let mut best_volume = 0u64;
        let mut best_prices = Vec::new();

        for &p in &candidates {
            let volume = buy_volume_at(p).min(sell_volume_at(p));

            match volume.cmp(&best_volume) {
                std::cmp::Ordering::Greater => {
                    best_volume = volume;
                    best_prices = vec![p];
                }
                std::cmp::Ordering::Equal if volume > 0 => best_prices.push(p),
                _ => {}
            }
        }

        if best_volume == 0 {
            return None;
        }

        let min_p = *best_prices.first().unwrap();
        let max_p = *best_prices.last().unwrap();
        if min_p == max_p {
            return Some(min_p);
        }

        // A tie across more than two adjacent prices, or across two prices
        // where one side's cumulative volume doesn't actually move between
        // them, is a plateau from one side running out of distinct price
        // levels -- not a genuine crossing. Only a true two-curve crossing
        // (both sides' volume change between the tied endpoints) earns the
        // midpoint; otherwise the lowest max-volume price is the single
        // clearing price.
        let is_genuine_crossing = best_prices.len() == 2
            && buy_volume_at(min_p) != buy_volume_at(max_p)
            && sell_volume_at(min_p) != sell_volume_at(max_p);

        if is_genuine_crossing {
            Some((min_p + max_p) / rust_decimal::Decimal::from(2))
        } else {
            Some(min_p)
        }
    }
}
