//! Identifier types for exchange entities
//!
//! Orders carry a monotonic 64-bit id handed out by the engine; markets are
//! keyed by their `"BASE/QUOTE"` ticker. Users are identified by 20-byte
//! chain addresses and created implicitly on first credit.

use serde::{Deserialize, Serialize};
use std::fmt;

pub use alloy_primitives::Address;

/// Unique identifier for an order
///
/// Monotonically increasing per engine instance, so ids double as a
/// submission-order tiebreaker when inspecting archived orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(u64);

impl OrderId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Market identifier (trading pair)
///
/// Format: "BASE/QUOTE" (e.g., "BTC/USD", "ETH/USDC"), derived from the
/// asset pair rather than parsed from raw strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketId(String);

impl MarketId {
    /// Derive the ticker for an asset pair.
    pub fn from_pair(base: &str, quote: &str) -> Self {
        Self(format!("{}/{}", base, quote))
    }

    /// Get the ticker string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
