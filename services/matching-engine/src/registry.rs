//! Market registry
//!
//! Keyed catalogue of trading pairs and their running liquidity counters.
//! Markets are created explicitly and never destroyed.

use std::collections::HashMap;

use alloy_primitives::I256;
use tracing::info;

use types::errors::EngineError;
use types::ids::MarketId;
use types::market::Market;

/// Per-ticker market records plus an insertion-order ticker list
#[derive(Debug, Default)]
pub struct MarketRegistry {
    markets: HashMap<String, Market>,
    tickers: Vec<String>,
}

impl MarketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a trading pair; idempotent on ticker
    ///
    /// A second call with the same pair returns the existing record,
    /// liquidity counters included.
    pub fn create_market(
        &mut self,
        base: &str,
        quote: &str,
        base_decimals: u8,
        quote_decimals: u8,
    ) -> Market {
        let ticker = MarketId::from_pair(base, quote);
        if let Some(existing) = self.markets.get(ticker.as_str()) {
            return existing.clone();
        }

        let market = Market::new(base, quote, base_decimals, quote_decimals);
        info!(ticker = %market.ticker, base_decimals, quote_decimals, "market created");
        self.tickers.push(ticker.as_str().to_string());
        self.markets
            .insert(ticker.as_str().to_string(), market.clone());
        market
    }

    /// Apply signed liquidity deltas to both sides atomically
    pub fn update_liquidity(
        &mut self,
        ticker: &str,
        buy_delta_base: I256,
        sell_delta_base: I256,
    ) -> Result<(), EngineError> {
        let market = self
            .markets
            .get_mut(ticker)
            .ok_or_else(|| EngineError::UnknownMarket {
                ticker: ticker.to_string(),
            })?;

        let buy = market
            .buy_liquidity_base
            .checked_add(buy_delta_base)
            .ok_or_else(|| EngineError::InternalInvariant("buy liquidity overflow".into()))?;
        let sell = market
            .sell_liquidity_base
            .checked_add(sell_delta_base)
            .ok_or_else(|| EngineError::InternalInvariant("sell liquidity overflow".into()))?;

        market.buy_liquidity_base = buy;
        market.sell_liquidity_base = sell;
        Ok(())
    }

    /// Snapshot of a market record
    pub fn get(&self, ticker: &str) -> Result<Market, EngineError> {
        self.markets
            .get(ticker)
            .cloned()
            .ok_or_else(|| EngineError::UnknownMarket {
                ticker: ticker.to_string(),
            })
    }

    /// Tickers in creation order
    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }
}
