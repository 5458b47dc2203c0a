//! Per-match arithmetic
//!
//! One match pairs a taker with the maker at the top of the opposing side.
//! The taker's budget caps the match: a BUY taker is bounded by the quote
//! it set aside at its own limit price, a SELL taker by its base size.
//! Both the fill path and the quote simulator run on these terms, so the
//! two cannot drift apart.

use alloy_primitives::U256;

use types::errors::EngineError;
use types::numeric::{base_to_quote, quote_to_base};
use types::order::Side;

/// Outcome of matching one taker slice against one maker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchTerms {
    /// Base consumed from the maker (and credited or debited accordingly)
    pub size_filled: U256,
    /// Quote leg at the maker's price
    pub quote_amount: U256,
    /// Taker budget left after this match
    pub budget_remaining: U256,
}

/// Compute the terms of one match
///
/// `fillable` is `min(maker remaining, taker remaining)`; the budget cap
/// may shrink it further. When a BUY taker's residual budget no longer
/// buys a single base unit at the maker's price, `size_filled` comes back
/// zero and the sweep must stop.
pub fn match_terms(
    taker_side: Side,
    fillable: U256,
    maker_price: U256,
    budget: U256,
    base_multiplier: U256,
) -> Result<MatchTerms, EngineError> {
    match taker_side {
        Side::BUY => {
            let quote_needed = base_to_quote(fillable, maker_price, base_multiplier)?;
            if quote_needed > budget {
                let size_filled = quote_to_base(budget, maker_price, base_multiplier)?;
                Ok(MatchTerms {
                    size_filled,
                    quote_amount: budget,
                    budget_remaining: U256::ZERO,
                })
            } else {
                Ok(MatchTerms {
                    size_filled: fillable,
                    quote_amount: quote_needed,
                    budget_remaining: budget - quote_needed,
                })
            }
        }
        Side::SELL => {
            let size_filled = if fillable > budget { budget } else { fillable };
            let quote_amount = base_to_quote(size_filled, maker_price, base_multiplier)?;
            Ok(MatchTerms {
                size_filled,
                quote_amount,
                budget_remaining: budget - size_filled,
            })
        }
    }
}
