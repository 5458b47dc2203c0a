//! Market records and liquidity counters

use std::fmt;

use alloy_primitives::{I256, U256};
use serde::{Deserialize, Serialize};

use crate::ids::MarketId;
use crate::numeric::pow10;

/// A trading pair
///
/// Liquidity counters accumulate resting base-token notional per side and
/// are decremented as fills consume it. They are signed so that deltas can
/// be applied uniformly from both the rest and the fill paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    pub ticker: MarketId,
    pub base_asset: String,
    pub quote_asset: String,
    pub base_decimals: u8,
    pub quote_decimals: u8,
    pub buy_liquidity_base: I256,
    pub sell_liquidity_base: I256,
}

impl Market {
    /// Create a market for an asset pair with zeroed liquidity
    pub fn new(base: &str, quote: &str, base_decimals: u8, quote_decimals: u8) -> Self {
        Self {
            ticker: MarketId::from_pair(base, quote),
            base_asset: base.to_string(),
            quote_asset: quote.to_string(),
            base_decimals,
            quote_decimals,
            buy_liquidity_base: I256::ZERO,
            sell_liquidity_base: I256::ZERO,
        }
    }

    /// `10^base_decimals`: the divisor for size/price products
    pub fn base_multiplier(&self) -> U256 {
        pow10(self.base_decimals)
    }

    /// `10^quote_decimals`
    pub fn quote_multiplier(&self) -> U256 {
        pow10(self.quote_decimals)
    }
}

impl fmt::Display for Market {
    /// Operator-facing summary with liquidity in whole base units
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}({}) / {}({})] buy_liq={} sell_liq={}",
            self.ticker,
            self.base_asset,
            self.base_decimals,
            self.quote_asset,
            self.quote_decimals,
            whole_units(self.buy_liquidity_base, self.base_multiplier()),
            whole_units(self.sell_liquidity_base, self.base_multiplier()),
        )
    }
}

fn whole_units(scaled: I256, multiplier: U256) -> I256 {
    match I256::try_from(multiplier) {
        Ok(divisor) if !divisor.is_zero() => scaled / divisor,
        _ => scaled,
    }
}
