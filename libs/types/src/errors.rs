//! Error taxonomy for the exchange
//!
//! Validation failures are surfaced to the caller with no state mutated;
//! `InternalInvariant` marks structural corruption and aborts the call.
//! Nothing is retried internally.

use thiserror::Error;

/// Top-level engine error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("insufficient funds: asset {asset}, required {required}, available {available}")]
    InsufficientFunds {
        asset: String,
        required: String,
        available: String,
    },

    #[error("unknown market: {ticker}")]
    UnknownMarket { ticker: String },

    #[error("invalid order: {0}")]
    InvalidOrder(String),

    #[error("no liquidity on the opposing side")]
    NoLiquidity,

    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),
}
