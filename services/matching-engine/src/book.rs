//! Per-market order book
//!
//! One price-ascending list holds both sides: BUYs form the low-price
//! prefix, SELLs the high-price suffix (the book never crosses because
//! takers go through the fill path, not `insert`). `buy_index` addresses
//! the last BUY (best bid), `sell_index` the first SELL (best ask).
//!
//! Both indices use `0` as a sentinel when their side is empty, so a
//! consumer must bounds-check and verify the side of the addressed entry
//! before treating it as a maker. Indices are signed because the sweep
//! decrements them past zero as the bid wall drains.

use std::fmt;

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use types::market::Market;
use types::order::{Order, Side};

/// Resting orders, the terminated-order archive, and the side indices
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderBook {
    pub(crate) orders: Vec<Order>,
    pub(crate) inactive: Vec<Order>,
    pub(crate) buy_index: i64,
    pub(crate) sell_index: i64,
    pub(crate) last_price: U256,
}

impl OrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a resting order at its price position
    ///
    /// The scan stops at the first entry with strictly greater price, so
    /// equal-priced entries keep time priority (FIFO). The index updates
    /// mirror the shift the insertion causes:
    /// - a BUY lands below the ask wall, pushing `buy_index` (and a
    ///   non-zero `sell_index`) right;
    /// - a SELL that lands at or below the current ask becomes the new
    ///   best ask.
    pub fn insert(&mut self, order: Order) {
        let side = order.side;
        let price = order.price;

        let mut insert_idx = self.orders.len();
        for (i, existing) in self.orders.iter().enumerate() {
            if price < existing.price {
                insert_idx = i;
                break;
            }
        }
        self.orders.insert(insert_idx, order);

        if self.orders.len() == 1 {
            self.last_price = price;
        } else {
            match side {
                Side::BUY => {
                    self.buy_index += 1;
                    if self.sell_index > 0 {
                        self.sell_index += 1;
                    }
                }
                Side::SELL => {
                    if (insert_idx as i64) < self.sell_index || self.sell_index <= 0 {
                        self.sell_index = insert_idx as i64;
                    }
                }
            }
        }
    }

    /// Index of the maker a taker of `taker_side` would hit next
    pub(crate) fn maker_index(&self, taker_side: Side) -> i64 {
        match taker_side {
            Side::BUY => self.sell_index,
            Side::SELL => self.buy_index,
        }
    }

    /// Resting (OPEN) orders in price order
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// Terminated orders in archival order
    pub fn inactive(&self) -> &[Order] {
        &self.inactive
    }

    /// Most recent execution price, zero if none
    pub fn last_price(&self) -> U256 {
        self.last_price
    }

    pub fn buy_index(&self) -> i64 {
        self.buy_index
    }

    pub fn sell_index(&self) -> i64 {
        self.sell_index
    }

    /// Best bid, if the addressed entry really is a BUY
    pub fn best_bid(&self) -> Option<&Order> {
        self.entry_of_side(self.buy_index, Side::BUY)
    }

    /// Best ask, if the addressed entry really is a SELL
    pub fn best_ask(&self) -> Option<&Order> {
        self.entry_of_side(self.sell_index, Side::SELL)
    }

    fn entry_of_side(&self, idx: i64, side: Side) -> Option<&Order> {
        if idx < 0 {
            return None;
        }
        self.orders
            .get(idx as usize)
            .filter(|order| order.side == side)
    }

    /// Check the price ordering invariant; used by tests and debug assertions
    pub fn is_price_sorted(&self) -> bool {
        self.orders.windows(2).all(|w| w[0].price <= w[1].price)
    }

    /// Adapter rendering the book in whole base/quote units
    ///
    /// The market supplies the decimals; orders are listed best ask down
    /// to worst bid, the way a trader reads a ladder.
    pub fn display<'a>(&'a self, market: &'a Market) -> OrderBookDisplay<'a> {
        OrderBookDisplay { book: self, market }
    }
}

/// Human-readable view of a book, scaled by its market's decimals
pub struct OrderBookDisplay<'a> {
    book: &'a OrderBook,
    market: &'a Market,
}

impl fmt::Display for OrderBookDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} | last price {} | buy index {} | sell index {}",
            self.market.ticker,
            self.book.last_price / self.market.quote_multiplier(),
            self.book.buy_index,
            self.book.sell_index,
        )?;

        if self.book.orders.is_empty() {
            return write!(f, "  no resting orders");
        }
        for (i, order) in self.book.orders.iter().rev().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  {}", order.display(self.market))?;
        }
        Ok(())
    }
}
