//! BTreeMap-based order book: price-time priority, one instance per
//! instrument.
//!
//! Key insight carried over unchanged: asks are stored under their natural
//! price (BTreeMap ascending, so the first entry is the best ask); bids are
//! stored under `Reverse(price)` so the first entry is the best bid. The
//! teacher used a `u64::MAX - price` key inversion because its prices were
//! raw integers; with `rust_decimal::Decimal` prices `std::cmp::Reverse` is
//! the idiomatic equivalent of the same trick.

use std::cmp::Reverse;
use std::collections::{BTreeMap, VecDeque};

use rust_decimal::Decimal;

use crate::core_types::{OrderId, TeamId, TradeId};
use crate::models::{AggressorSide, Order, OrderStatus, Side, Trade};

type PriceLevel = VecDeque<Order>;

#[derive(Debug, Clone, Copy)]
pub struct PriceLevelSummary {
    pub price: Decimal,
    pub quantity: u64,
}

#[derive(Debug, Clone, Default)]
pub struct DepthSnapshot {
    /// Descending by price.
    pub bids: Vec<PriceLevelSummary>,
    /// Ascending by price.
    pub asks: Vec<PriceLevelSummary>,
}

/// A single instrument's order book.
pub struct OrderBook {
    asks: BTreeMap<Decimal, PriceLevel>,
    bids: BTreeMap<Reverse<Decimal>, PriceLevel>,
    trade_id_counter: TradeId,
}

impl OrderBook {
    pub fn new() -> Self {
        Self {
            asks: BTreeMap::new(),
            bids: BTreeMap::new(),
            trade_id_counter: 0,
        }
    }

    /// Add an order to the book, matching greedily against the opposite
    /// side first. Any limit remainder rests; any market remainder is
    /// discarded unfilled. `aggressor_side` is the side of the arriving
    /// order — `AggressorSide::None` when called from the batch engine
    /// releasing an unmatched remainder (no aggression is being modeled).
    pub fn add_order(
        &mut self,
        mut order: Order,
        aggressor: AggressorSide,
    ) -> (OrderStatus, Vec<Trade>, u64) {
        let mut trades = Vec::new();

        match order.side {
            Side::Buy => self.match_buy(&mut order, aggressor, &mut trades),
            Side::Sell => self.match_sell(&mut order, aggressor, &mut trades),
        }

        let status = if order.is_filled() {
            OrderStatus::Filled
        } else if !trades.is_empty() {
            OrderStatus::PartiallyFilled
        } else {
            OrderStatus::New
        };

        let remaining = order.remaining_quantity;
        if remaining > 0 && order.order_type == crate::models::OrderType::Limit {
            self.rest_order(order);
        }
        // A market remainder with no counter liquidity is discarded; the
        // venue surfaces NO_LIQUIDITY when nothing filled at all.

        (status, trades, remaining)
    }

    fn match_buy(&mut self, buy: &mut Order, aggressor: AggressorSide, trades: &mut Vec<Trade>) {
        let mut empty = Vec::new();

        for (&price, level) in self.asks.iter_mut() {
            if let Some(limit) = buy.price {
                if limit < price {
                    break;
                }
            }
            if buy.remaining_quantity == 0 {
                break;
            }

            while let Some(sell) = level.front_mut() {
                let qty = buy.remaining_quantity.min(sell.remaining_quantity);
                self.trade_id_counter += 1;
                trades.push(Trade {
                    trade_id: self.trade_id_counter,
                    instrument_id: buy.instrument_id,
                    buyer_id: buy.trader_id,
                    seller_id: sell.trader_id,
                    buyer_order_id: buy.order_id,
                    seller_order_id: sell.order_id,
                    price,
                    quantity: qty,
                    aggressor_side: aggressor,
                    timestamp: buy.timestamp,
                });

                buy.remaining_quantity -= qty;
                sell.remaining_quantity -= qty;

                if sell.remaining_quantity == 0 {
                    level.pop_front();
                }
                if buy.remaining_quantity == 0 {
                    break;
                }
            }

            if level.is_empty() {
                empty.push(price);
            }
            if buy.remaining_quantity == 0 {
                break;
            }
        }

        for price in empty {
            self.asks.remove(&price);
        }
    }

    fn match_sell(&mut self, sell: &mut Order, aggressor: AggressorSide, trades: &mut Vec<Trade>) {
        let mut empty = Vec::new();

        for (&Reverse(price), level) in self.bids.iter_mut() {
            if let Some(limit) = sell.price {
                if limit > price {
                    break;
                }
            }
            if sell.remaining_quantity == 0 {
                break;
            }

            while let Some(buy) = level.front_mut() {
                let qty = sell.remaining_quantity.min(buy.remaining_quantity);
                self.trade_id_counter += 1;
                trades.push(Trade {
                    trade_id: self.trade_id_counter,
                    instrument_id: sell.instrument_id,
                    buyer_id: buy.trader_id,
                    seller_id: sell.trader_id,
                    buyer_order_id: buy.order_id,
                    seller_order_id: sell.order_id,
                    price,
                    quantity: qty,
                    aggressor_side: aggressor,
                    timestamp: sell.timestamp,
                });

                sell.remaining_quantity -= qty;
                buy.remaining_quantity -= qty;

                if buy.remaining_quantity == 0 {
                    level.pop_front();
                }
                if sell.remaining_quantity == 0 {
                    break;
                }
            }

            if level.is_empty() {
                empty.push(Reverse(price));
            }
            if sell.remaining_quantity == 0 {
                break;
            }
        }

        for key in empty {
            self.bids.remove(&key);
        }
    }

    fn rest_order(&mut self, order: Order) {
        let price = order.price.expect("limit order rested without a price");
        match order.side {
            Side::Buy => self.bids.entry(Reverse(price)).or_default().push_back(order),
            Side::Sell => self.asks.entry(price).or_default().push_back(order),
        }
    }

    /// Remove an order by id, only if owned by `trader_id`. `Ok(())` on
    /// success; `Err(true)` if the order exists but belongs to someone else
    /// (a hard fault per spec.md §4.1); `Err(false)` if absent.
    pub fn cancel(&mut self, order_id: OrderId, trader_id: TeamId) -> Result<(), bool> {
        for level in self.bids.values_mut().chain(self.asks.values_mut()) {
            if let Some(pos) = level.iter().position(|o| o.order_id == order_id) {
                if level[pos].trader_id != trader_id {
                    return Err(true);
                }
                level.remove(pos);
                self.prune_empty_levels();
                return Ok(());
            }
        }
        Err(false)
    }

    fn prune_empty_levels(&mut self) {
        self.bids.retain(|_, lvl| !lvl.is_empty());
        self.asks.retain(|_, lvl| !lvl.is_empty());
    }

    pub fn best_bid(&self) -> Option<PriceLevelSummary> {
        self.bids.iter().next().map(|(Reverse(price), level)| PriceLevelSummary {
            price: *price,
            quantity: level.iter().map(|o| o.remaining_quantity).sum(),
        })
    }

    pub fn best_ask(&self) -> Option<PriceLevelSummary> {
        self.asks.iter().next().map(|(price, level)| PriceLevelSummary {
            price: *price,
            quantity: level.iter().map(|o| o.remaining_quantity).sum(),
        })
    }

    pub fn depth_snapshot(&self) -> DepthSnapshot {
        DepthSnapshot {
            bids: self
                .bids
                .iter()
                .map(|(Reverse(price), level)| PriceLevelSummary {
                    price: *price,
                    quantity: level.iter().map(|o| o.remaining_quantity).sum(),
                })
                .collect(),
            asks: self
                .asks
                .iter()
                .map(|(price, level)| PriceLevelSummary {
                    price: *price,
                    quantity: level.iter().map(|o| o.remaining_quantity).sum(),
                })
                .collect(),
        }
    }

    /// Cancel every resting order on both sides, returning their ids so the
    /// caller can notify owning teams. Used on a `continuous -> closed`
    /// phase transition (spec.md §4.5).
    pub fn cancel_all(&mut self) -> Vec<OrderId> {
        let mut ids: Vec<OrderId> = self
            .bids
            .values()
            .flatten()
            .chain(self.asks.values().flatten())
            .map(|o| o.order_id)
            .collect();
        self.bids.clear();
        self.asks.clear();
        ids.sort_unstable();
        ids
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}
