//! Engine core
//!
//! Owns the ledger, the market registry and one book per ticker
//! (constructor injection, no service registry). `place_order` is the
//! single mutating entry point: it validates funds, then either rests the
//! order with a reservation or sweeps the opposing side with paired
//! ledger transfers. `get_quote` runs the same sweep arithmetic on copied
//! state and never touches the ledger.

use std::collections::HashMap;

use alloy_primitives::{Address, I256, U256};
use serde::{Deserialize, Serialize};
use tracing::debug;

use types::errors::EngineError;
use types::ids::OrderId;
use types::market::Market;
use types::numeric::base_to_quote;
use types::order::{Order, OrderStatus, Side};

use crate::book::OrderBook;
use crate::ledger::Ledger;
use crate::matching::match_terms;
use crate::registry::MarketRegistry;

/// Result of simulating a fill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Budget consumed: quote for a BUY taker, base for a SELL taker
    pub amount_in: U256,
    /// Proceeds: base for a BUY taker, quote for a SELL taker
    pub amount_out: U256,
    /// Volume-weighted execution price, quote-scaled
    pub execution_price: U256,
}

/// The spot exchange engine
#[derive(Debug, Default)]
pub struct Engine {
    ledger: Ledger,
    registry: MarketRegistry,
    books: HashMap<String, OrderBook>,
    order_id: u64,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a trading pair (idempotent) and its book
    pub fn create_market(
        &mut self,
        base: &str,
        quote: &str,
        base_decimals: u8,
        quote_decimals: u8,
    ) -> Market {
        let market = self
            .registry
            .create_market(base, quote, base_decimals, quote_decimals);
        self.books
            .entry(market.ticker.as_str().to_string())
            .or_default();
        market
    }

    /// Credit a deposit to a user's ledger entry
    pub fn credit_deposit(
        &mut self,
        user: Address,
        asset: &str,
        amount: U256,
    ) -> Result<(), EngineError> {
        debug!(%user, asset, %amount, "deposit credited");
        self.ledger.add_balance(user, asset, amount)
    }

    /// Hand out the next monotonic order id
    pub fn next_order_id(&mut self) -> OrderId {
        self.order_id += 1;
        OrderId::new(self.order_id)
    }

    /// Submit an order
    ///
    /// With `fill == false` the order rests: the required funds are
    /// reserved and the book and liquidity counters updated. With
    /// `fill == true` the order sweeps the opposing side immediately; an
    /// unfilled remainder is dropped, never re-rested.
    ///
    /// Every validation failure surfaces before the first mutation, so a
    /// rejected submission leaves the engine untouched.
    pub fn place_order(&mut self, order: Order, fill: bool) -> Result<(), EngineError> {
        let market = self.registry.get(order.market.as_str())?;
        order.validate()?;

        let (asset, required) = match order.side {
            Side::BUY => (
                market.quote_asset.clone(),
                base_to_quote(order.size, order.price, market.base_multiplier())?,
            ),
            Side::SELL => (market.base_asset.clone(), order.size),
        };

        let balance = self.ledger.balance(order.user, &asset);
        if balance < required {
            return Err(EngineError::InsufficientFunds {
                asset,
                required: required.to_string(),
                available: balance.to_string(),
            });
        }

        if fill {
            return self.fill_order(order, &market);
        }

        // Rest: reserve, insert, account the liquidity.
        self.ledger.lock(order.user, &asset, required)?;
        let side = order.side;
        let size = order.size;
        debug!(order = %order.id, ?side, price = %order.price, size = %size, "order resting");
        self.books
            .entry(market.ticker.as_str().to_string())
            .or_default()
            .insert(order);

        let delta = signed(size)?;
        match side {
            Side::BUY => self
                .registry
                .update_liquidity(market.ticker.as_str(), delta, I256::ZERO),
            Side::SELL => self
                .registry
                .update_liquidity(market.ticker.as_str(), I256::ZERO, delta),
        }
    }

    /// Sweep the opposing side with a taker order
    ///
    /// The taker's funds were checked by `place_order` and are consumed
    /// directly, bypassing the locked column; makers' reservations are
    /// released match by match before the matching debit, which keeps
    /// `locked <= balance` at every intermediate step.
    fn fill_order(&mut self, mut taker: Order, market: &Market) -> Result<(), EngineError> {
        let ticker = market.ticker.as_str().to_string();
        let base_mult = market.base_multiplier();

        let mut remaining = taker.size;
        let mut budget = match taker.side {
            Side::BUY => base_to_quote(taker.size, taker.price, base_mult)?,
            Side::SELL => taker.size,
        };

        let book = self.books.entry(ticker.clone()).or_default();

        while remaining > U256::ZERO {
            if book.orders.is_empty() {
                break;
            }
            let maker_idx = book.maker_index(taker.side);
            if maker_idx < 0 || maker_idx as usize >= book.orders.len() {
                break;
            }
            let idx = maker_idx as usize;

            let (maker_user, maker_price, maker_available, maker_side) = {
                let maker = &book.orders[idx];
                (maker.user, maker.price, maker.remaining(), maker.side)
            };
            // The sentinel index can address the taker's own side when the
            // opposing side is empty.
            if maker_side == taker.side {
                break;
            }

            let fillable = if maker_available >= remaining {
                remaining
            } else {
                maker_available
            };
            let terms = match_terms(taker.side, fillable, maker_price, budget, base_mult)?;
            budget = terms.budget_remaining;
            if terms.size_filled.is_zero() {
                // Residual budget no longer buys one base unit.
                break;
            }

            match taker.side {
                Side::BUY => {
                    // Maker rests a SELL: its base reservation funds the debit.
                    self.ledger
                        .unlock(maker_user, &market.base_asset, terms.size_filled)?;
                    self.ledger
                        .add_balance(maker_user, &market.quote_asset, terms.quote_amount)?;
                    self.ledger
                        .sub_balance(maker_user, &market.base_asset, terms.size_filled)?;
                    self.ledger
                        .add_balance(taker.user, &market.base_asset, terms.size_filled)?;
                    self.ledger
                        .sub_balance(taker.user, &market.quote_asset, terms.quote_amount)?;
                }
                Side::SELL => {
                    // Maker rests a BUY: its quote reservation funds the debit.
                    self.ledger
                        .unlock(maker_user, &market.quote_asset, terms.quote_amount)?;
                    self.ledger
                        .add_balance(maker_user, &market.base_asset, terms.size_filled)?;
                    self.ledger
                        .sub_balance(maker_user, &market.quote_asset, terms.quote_amount)?;
                    self.ledger
                        .add_balance(taker.user, &market.quote_asset, terms.quote_amount)?;
                    self.ledger
                        .sub_balance(taker.user, &market.base_asset, terms.size_filled)?;
                }
            }

            remaining = remaining
                .checked_sub(terms.size_filled)
                .ok_or_else(|| EngineError::InternalInvariant("fill exceeds remaining".into()))?;
            taker.record_fill(terms.size_filled)?;
            book.orders[idx].record_fill(terms.size_filled)?;
            book.last_price = maker_price;
            debug!(
                taker = %taker.id,
                maker = %book.orders[idx].id,
                price = %maker_price,
                size = %terms.size_filled,
                "match"
            );

            if book.orders[idx].is_filled() {
                let mut filled = book.orders.remove(idx);
                filled.status = OrderStatus::Filled;
                book.inactive.push(filled);
                // A SELL taker eats the bid wall from its right edge; the
                // removal shifts both walls left. A BUY taker's removal
                // leaves the next ask at the same index.
                if taker.side == Side::SELL {
                    book.sell_index -= 1;
                    book.buy_index -= 1;
                }
            }
        }

        taker.status = OrderStatus::Filled;
        let consumed = taker.size_filled;
        let taker_side = taker.side;
        debug!(order = %taker.id, filled = %consumed, "taker archived");
        book.inactive.push(taker);

        let delta = signed(consumed)?
            .checked_neg()
            .ok_or_else(|| EngineError::InternalInvariant("liquidity delta overflow".into()))?;
        match taker_side {
            Side::BUY => self.registry.update_liquidity(&ticker, I256::ZERO, delta),
            Side::SELL => self.registry.update_liquidity(&ticker, delta, I256::ZERO),
        }
    }

    /// Simulate a fill without mutating any state
    ///
    /// Runs the sweep on a copy of the book and reports the budget the
    /// order would consume, the proceeds it would receive and the
    /// resulting volume-weighted price. Fails with `NoLiquidity` when
    /// nothing on the opposing side is reachable.
    pub fn get_quote(&self, order: &Order) -> Result<Quote, EngineError> {
        let market = self.registry.get(order.market.as_str())?;
        order.validate()?;
        let base_mult = market.base_multiplier();

        let (mut orders, mut buy_index, mut sell_index) =
            match self.books.get(market.ticker.as_str()) {
                Some(book) => (book.orders.clone(), book.buy_index, book.sell_index),
                None => (Vec::new(), 0, 0),
            };

        let mut remaining = order.size;
        let initial_budget = match order.side {
            Side::BUY => base_to_quote(order.size, order.price, base_mult)?,
            Side::SELL => order.size,
        };
        let mut budget = initial_budget;
        let mut amount_out = U256::ZERO;

        while remaining > U256::ZERO {
            if orders.is_empty() {
                break;
            }
            let maker_idx = match order.side {
                Side::BUY => sell_index,
                Side::SELL => buy_index,
            };
            if maker_idx < 0 || maker_idx as usize >= orders.len() {
                break;
            }
            let idx = maker_idx as usize;
            if orders[idx].side == order.side {
                break;
            }

            let maker_available = orders[idx].remaining();
            let maker_price = orders[idx].price;
            let fillable = if maker_available >= remaining {
                remaining
            } else {
                maker_available
            };
            let terms = match_terms(order.side, fillable, maker_price, budget, base_mult)?;
            budget = terms.budget_remaining;
            if terms.size_filled.is_zero() {
                break;
            }

            let proceeds = match order.side {
                Side::BUY => terms.size_filled,
                Side::SELL => terms.quote_amount,
            };
            amount_out = amount_out
                .checked_add(proceeds)
                .ok_or_else(|| EngineError::InternalInvariant("amount_out overflow".into()))?;

            remaining = remaining
                .checked_sub(terms.size_filled)
                .ok_or_else(|| EngineError::InternalInvariant("fill exceeds remaining".into()))?;
            orders[idx].record_fill(terms.size_filled)?;
            if orders[idx].is_filled() {
                orders.remove(idx);
                if order.side == Side::SELL {
                    sell_index -= 1;
                    buy_index -= 1;
                }
            }
        }

        let amount_in = initial_budget - budget;
        if amount_out.is_zero() || amount_in.is_zero() {
            return Err(EngineError::NoLiquidity);
        }
        let execution_price = match order.side {
            Side::BUY => {
                amount_in
                    .checked_mul(base_mult)
                    .ok_or_else(|| EngineError::InternalInvariant("price overflow".into()))?
                    / amount_out
            }
            Side::SELL => {
                amount_out
                    .checked_mul(base_mult)
                    .ok_or_else(|| EngineError::InternalInvariant("price overflow".into()))?
                    / amount_in
            }
        };

        Ok(Quote {
            amount_in,
            amount_out,
            execution_price,
        })
    }

    /// Snapshot of the resting orders for a ticker
    pub fn active_orders(&self, ticker: &str) -> Vec<Order> {
        self.books
            .get(ticker)
            .map(|book| book.orders.clone())
            .unwrap_or_default()
    }

    /// Snapshot of the terminated orders for a ticker
    pub fn inactive_orders(&self, ticker: &str) -> Vec<Order> {
        self.books
            .get(ticker)
            .map(|book| book.inactive.clone())
            .unwrap_or_default()
    }

    /// Market record snapshot
    pub fn market(&self, ticker: &str) -> Result<Market, EngineError> {
        self.registry.get(ticker)
    }

    /// Most recent execution price for a ticker, zero if none
    pub fn last_price(&self, ticker: &str) -> Result<U256, EngineError> {
        let book = self
            .books
            .get(ticker)
            .ok_or_else(|| EngineError::UnknownMarket {
                ticker: ticker.to_string(),
            })?;
        Ok(book.last_price())
    }

    /// The book itself, for read-side inspection
    pub fn book(&self, ticker: &str) -> Option<&OrderBook> {
        self.books.get(ticker)
    }

    pub fn balance(&self, user: Address, asset: &str) -> U256 {
        self.ledger.balance(user, asset)
    }

    pub fn locked(&self, user: Address, asset: &str) -> U256 {
        self.ledger.locked(user, asset)
    }

    pub fn available(&self, user: Address, asset: &str) -> U256 {
        self.ledger.available(user, asset)
    }
}

fn signed(value: U256) -> Result<I256, EngineError> {
    I256::try_from(value)
        .map_err(|_| EngineError::InternalInvariant("liquidity delta overflows I256".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ids::MarketId;
    use types::numeric::pow10;

    fn user(n: u8) -> Address {
        Address::with_last_byte(n)
    }

    fn usd(n: u64) -> U256 {
        U256::from(n) * pow10(6)
    }

    fn btc(n: u64) -> U256 {
        U256::from(n) * pow10(8)
    }

    fn setup() -> Engine {
        let mut engine = Engine::new();
        engine.create_market("BTC", "USD", 8, 6);
        engine
    }

    fn new_order(engine: &mut Engine, u: Address, side: Side, size: U256, price: U256) -> Order {
        let id = engine.next_order_id();
        Order::new(
            id,
            u,
            side,
            size,
            price,
            MarketId::from_pair("BTC", "USD"),
            1_708_123_456_789_000_000,
        )
    }

    #[test]
    fn test_order_ids_are_monotonic() {
        let mut engine = setup();
        let a = engine.next_order_id();
        let b = engine.next_order_id();
        assert!(b > a);
    }

    #[test]
    fn test_place_order_unknown_market() {
        let mut engine = Engine::new();
        let order = Order::new(
            OrderId::new(1),
            user(1),
            Side::BUY,
            btc(1),
            usd(100),
            MarketId::from_pair("ETH", "USD"),
            0,
        );
        assert!(matches!(
            engine.place_order(order, false),
            Err(EngineError::UnknownMarket { .. })
        ));
    }

    #[test]
    fn test_place_order_invalid_shape() {
        let mut engine = setup();
        let order = new_order(&mut engine, user(1), Side::BUY, U256::ZERO, usd(100));
        assert!(matches!(
            engine.place_order(order, false),
            Err(EngineError::InvalidOrder(_))
        ));
    }

    #[test]
    fn test_resting_buy_reserves_quote() {
        let mut engine = setup();
        engine.credit_deposit(user(1), "USD", usd(200_000)).unwrap();

        let order = new_order(&mut engine, user(1), Side::BUY, btc(1), usd(111_000));
        engine.place_order(order, false).unwrap();

        assert_eq!(engine.locked(user(1), "USD"), usd(111_000));
        assert_eq!(engine.available(user(1), "USD"), usd(89_000));
        assert_eq!(engine.active_orders("BTC/USD").len(), 1);
    }

    #[test]
    fn test_fill_against_empty_book_archives_taker() {
        let mut engine = setup();
        engine.credit_deposit(user(1), "USD", usd(1_000)).unwrap();

        let order = new_order(&mut engine, user(1), Side::BUY, btc(1), usd(1_000));
        engine.place_order(order, true).unwrap();

        let inactive = engine.inactive_orders("BTC/USD");
        assert_eq!(inactive.len(), 1);
        assert_eq!(inactive[0].size_filled, U256::ZERO);
        assert_eq!(inactive[0].status, OrderStatus::Filled);
        // nothing moved
        assert_eq!(engine.balance(user(1), "USD"), usd(1_000));
    }

    #[test]
    fn test_simple_cross() {
        let mut engine = setup();
        engine.credit_deposit(user(1), "BTC", btc(1)).unwrap();
        engine.credit_deposit(user(2), "USD", usd(100_000)).unwrap();

        let sell = new_order(&mut engine, user(1), Side::SELL, btc(1), usd(100_000));
        engine.place_order(sell, false).unwrap();

        let buy = new_order(&mut engine, user(2), Side::BUY, btc(1), usd(100_000));
        engine.place_order(buy, true).unwrap();

        assert_eq!(engine.balance(user(1), "USD"), usd(100_000));
        assert_eq!(engine.balance(user(1), "BTC"), U256::ZERO);
        assert_eq!(engine.locked(user(1), "BTC"), U256::ZERO);
        assert_eq!(engine.balance(user(2), "BTC"), btc(1));
        assert_eq!(engine.balance(user(2), "USD"), U256::ZERO);
        assert_eq!(engine.last_price("BTC/USD").unwrap(), usd(100_000));
        assert!(engine.active_orders("BTC/USD").is_empty());
        assert_eq!(engine.inactive_orders("BTC/USD").len(), 2);
    }

    #[test]
    fn test_quote_empty_book_is_no_liquidity() {
        let mut engine = setup();
        engine.credit_deposit(user(1), "USD", usd(1_000)).unwrap();
        let order = new_order(&mut engine, user(1), Side::BUY, btc(1), usd(1_000));
        assert_eq!(engine.get_quote(&order), Err(EngineError::NoLiquidity));
    }

    #[test]
    fn test_quote_does_not_mutate() {
        let mut engine = setup();
        engine.credit_deposit(user(1), "BTC", btc(2)).unwrap();
        engine.credit_deposit(user(2), "USD", usd(300_000)).unwrap();

        let sell = new_order(&mut engine, user(1), Side::SELL, btc(1), usd(100_000));
        engine.place_order(sell, false).unwrap();

        let buy = new_order(&mut engine, user(2), Side::BUY, btc(1), usd(100_000));
        let quote = engine.get_quote(&buy).unwrap();
        assert_eq!(quote.amount_in, usd(100_000));
        assert_eq!(quote.amount_out, btc(1));
        assert_eq!(quote.execution_price, usd(100_000));

        // the simulated sweep left everything in place
        assert_eq!(engine.active_orders("BTC/USD").len(), 1);
        assert_eq!(engine.balance(user(2), "USD"), usd(300_000));
        assert_eq!(engine.locked(user(1), "BTC"), btc(1));
    }
}
