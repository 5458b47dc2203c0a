//! Order lifecycle types

use std::fmt;

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::errors::EngineError;
use crate::ids::{Address, MarketId, OrderId};
use crate::market::Market;

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order (bid)
    BUY,
    /// Sell order (ask)
    SELL,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::BUY => Side::SELL,
            Side::SELL => Side::BUY,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::BUY => write!(f, "BUY"),
            Side::SELL => write!(f, "SELL"),
        }
    }
}

/// Order status
///
/// A taker order is archived as `Filled` after its sweep even when
/// `size_filled < size` (budget- or liquidity-capped); `size_filled` is
/// authoritative for how much actually traded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    /// Resting on the book
    Open,
    /// Terminated without a full fill (terminal)
    Closed,
    /// Done trading (terminal)
    Filled,
}

impl OrderStatus {
    /// Check if status is terminal (no further transitions possible)
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Closed | OrderStatus::Filled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Open => write!(f, "OPEN"),
            OrderStatus::Closed => write!(f, "CLOSED"),
            OrderStatus::Filled => write!(f, "FILLED"),
        }
    }
}

/// A limit order
///
/// `size` is base-scaled, `price` is quote-scaled (quote per one whole
/// base unit). Invariants: `0 <= size_filled <= size`, `size > 0`,
/// `price > 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user: Address,
    pub side: Side,
    pub size: U256,
    pub price: U256,
    pub size_filled: U256,
    pub created_at: i64, // Unix nanos
    pub status: OrderStatus,
    pub market: MarketId,
}

impl Order {
    /// Create a new open order with nothing filled
    pub fn new(
        id: OrderId,
        user: Address,
        side: Side,
        size: U256,
        price: U256,
        market: MarketId,
        created_at: i64,
    ) -> Self {
        Self {
            id,
            user,
            side,
            size,
            price,
            size_filled: U256::ZERO,
            created_at,
            status: OrderStatus::Open,
            market,
        }
    }

    /// Unfilled size remaining on the order
    pub fn remaining(&self) -> U256 {
        self.size.saturating_sub(self.size_filled)
    }

    /// Check if the order is completely filled
    pub fn is_filled(&self) -> bool {
        self.size_filled == self.size
    }

    /// Validate the order shape at submission time
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.size.is_zero() {
            return Err(EngineError::InvalidOrder("size must be positive".into()));
        }
        if self.price.is_zero() {
            return Err(EngineError::InvalidOrder("price must be positive".into()));
        }
        if !self.size_filled.is_zero() {
            return Err(EngineError::InvalidOrder(
                "size_filled must be zero at submission".into(),
            ));
        }
        Ok(())
    }

    /// Record a fill against the order
    ///
    /// Status transitions are the engine's concern; this only accumulates
    /// and enforces `size_filled <= size`.
    pub fn record_fill(&mut self, amount: U256) -> Result<(), EngineError> {
        let new_filled = self
            .size_filled
            .checked_add(amount)
            .ok_or_else(|| EngineError::InternalInvariant("size_filled overflow".into()))?;
        if new_filled > self.size {
            return Err(EngineError::InternalInvariant(format!(
                "fill would exceed order size: order {}",
                self.id
            )));
        }
        self.size_filled = new_filled;
        Ok(())
    }

    /// Adapter rendering the order in whole base/quote units
    ///
    /// Sizes come out divided by `10^base_decimals`, the price by
    /// `10^quote_decimals` (both truncating), so a scan of a book dump
    /// reads in human terms.
    pub fn display<'a>(&'a self, market: &'a Market) -> OrderDisplay<'a> {
        OrderDisplay {
            order: self,
            market,
        }
    }
}

/// Human-readable view of an order, scaled by its market's decimals
pub struct OrderDisplay<'a> {
    order: &'a Order,
    market: &'a Market,
}

impl fmt::Display for OrderDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = self.market.base_multiplier();
        let quote = self.market.quote_multiplier();
        write!(
            f,
            "order #{} | {} | size {} | price {} | filled {} | {} | {}",
            self.order.id,
            self.order.side,
            self.order.size / base,
            self.order.price / quote,
            self.order.size_filled / base,
            self.order.market,
            self.order.status,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_order(side: Side, size: u64, price: u64) -> Order {
        Order::new(
            OrderId::new(1),
            Address::with_last_byte(1),
            side,
            U256::from(size),
            U256::from(price),
            MarketId::from_pair("BTC", "USD"),
            1_708_123_456_789_000_000,
        )
    }

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::BUY.opposite(), Side::SELL);
        assert_eq!(Side::SELL.opposite(), Side::BUY);
    }

    #[test]
    fn test_order_creation() {
        let order = test_order(Side::BUY, 100, 50);
        assert_eq!(order.status, OrderStatus::Open);
        assert_eq!(order.size_filled, U256::ZERO);
        assert_eq!(order.remaining(), U256::from(100u64));
        assert!(order.validate().is_ok());
    }

    #[test]
    fn test_order_validate_rejects_zero_size() {
        let order = test_order(Side::BUY, 0, 50);
        assert!(matches!(
            order.validate(),
            Err(EngineError::InvalidOrder(_))
        ));
    }

    #[test]
    fn test_order_validate_rejects_zero_price() {
        let order = test_order(Side::SELL, 100, 0);
        assert!(matches!(
            order.validate(),
            Err(EngineError::InvalidOrder(_))
        ));
    }

    #[test]
    fn test_order_validate_rejects_prefilled() {
        let mut order = test_order(Side::BUY, 100, 50);
        order.size_filled = U256::from(1u64);
        assert!(matches!(
            order.validate(),
            Err(EngineError::InvalidOrder(_))
        ));
    }

    #[test]
    fn test_record_fill_accumulates() {
        let mut order = test_order(Side::BUY, 100, 50);
        order.record_fill(U256::from(30u64)).unwrap();
        order.record_fill(U256::from(70u64)).unwrap();
        assert!(order.is_filled());
        assert_eq!(order.remaining(), U256::ZERO);
    }

    #[test]
    fn test_record_fill_rejects_overfill() {
        let mut order = test_order(Side::BUY, 100, 50);
        let err = order.record_fill(U256::from(101u64)).unwrap_err();
        assert!(matches!(err, EngineError::InternalInvariant(_)));
        assert_eq!(order.size_filled, U256::ZERO);
    }

    #[test]
    fn test_status_terminal() {
        assert!(!OrderStatus::Open.is_terminal());
        assert!(OrderStatus::Closed.is_terminal());
        assert!(OrderStatus::Filled.is_terminal());
    }

    #[test]
    fn test_side_and_status_display() {
        assert_eq!(Side::BUY.to_string(), "BUY");
        assert_eq!(OrderStatus::Open.to_string(), "OPEN");
        assert_eq!(OrderStatus::Filled.to_string(), "FILLED");
    }

    #[test]
    fn test_order_display_in_whole_units() {
        let market = Market::new("BTC", "USD", 8, 6);
        let mut order = Order::new(
            OrderId::new(3),
            Address::with_last_byte(1),
            Side::BUY,
            U256::from(2u64) * market.base_multiplier(),
            U256::from(111_000u64) * market.quote_multiplier(),
            MarketId::from_pair("BTC", "USD"),
            1_708_123_456_789_000_000,
        );
        order.record_fill(market.base_multiplier()).unwrap();

        let rendered = order.display(&market).to_string();
        assert_eq!(
            rendered,
            "order #3 | BUY | size 2 | price 111000 | filled 1 | BTC/USD | OPEN"
        );
    }

    #[test]
    fn test_order_serialization() {
        let order = test_order(Side::SELL, 100, 50);
        let json = serde_json::to_string(&order).unwrap();
        let deserialized: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(order, deserialized);
        assert!(json.contains("\"SELL\""));
        assert!(json.contains("\"OPEN\""));
    }
}
