//! Scaled-integer conversions between base and quote units
//!
//! Sizes are scaled by `10^base_decimals`, prices by `10^quote_decimals`
//! (quote per one whole base unit). Every conversion truncates toward
//! zero, so a maker can be underpaid by at most one unit in the least
//! significant quote digit per distinct execution price. The asymmetry
//! always favours the book, never the taker.

use alloy_primitives::U256;

use crate::errors::EngineError;

/// `10^decimals` as a U256.
///
/// Callers pass token decimals (realistically <= 18); values above 77
/// do not fit 256 bits.
pub fn pow10(decimals: u8) -> U256 {
    U256::from(10u8).pow(U256::from(decimals))
}

/// Convert a base-scaled size into its quote-scaled notional at `price`.
///
/// `size_base * price / 10^base_decimals`, truncating.
pub fn base_to_quote(
    size_base: U256,
    price: U256,
    base_multiplier: U256,
) -> Result<U256, EngineError> {
    let notional = size_base
        .checked_mul(price)
        .ok_or_else(|| EngineError::InternalInvariant("notional overflows 256 bits".into()))?;
    Ok(notional / base_multiplier)
}

/// Convert a quote-scaled amount into the base-scaled size it buys at `price`.
///
/// `amount_quote * 10^base_decimals / price`, truncating. `price` must be
/// non-zero; order validation guarantees this before any conversion runs.
pub fn quote_to_base(
    amount_quote: U256,
    price: U256,
    base_multiplier: U256,
) -> Result<U256, EngineError> {
    if price.is_zero() {
        return Err(EngineError::InternalInvariant(
            "conversion at zero price".into(),
        ));
    }
    let scaled = amount_quote
        .checked_mul(base_multiplier)
        .ok_or_else(|| EngineError::InternalInvariant("scaled amount overflows 256 bits".into()))?;
    Ok(scaled / price)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pow10() {
        assert_eq!(pow10(0), U256::from(1u64));
        assert_eq!(pow10(6), U256::from(1_000_000u64));
        assert_eq!(pow10(8), U256::from(100_000_000u64));
    }

    #[test]
    fn test_base_to_quote_whole_units() {
        // 1 BTC at 111_000 USD (8/6 decimals)
        let size = U256::from(100_000_000u64);
        let price = U256::from(111_000u64) * pow10(6);

        let quote = base_to_quote(size, price, pow10(8)).unwrap();
        assert_eq!(quote, U256::from(111_000u64) * pow10(6));
    }

    #[test]
    fn test_base_to_quote_truncates() {
        // 1 base unit (10^-8 BTC) at price 3: 3 / 10^8 truncates to zero
        let quote = base_to_quote(U256::from(1u64), U256::from(3u64), pow10(8)).unwrap();
        assert_eq!(quote, U256::ZERO);
    }

    #[test]
    fn test_quote_to_base_round_trip_loss() {
        let mult = pow10(8);
        let price = U256::from(100u64) * pow10(6);

        // 1.5 quote units of dust below one base tick disappears
        let size = U256::from(150_000_000u64);
        let quote = base_to_quote(size, price, mult).unwrap();
        let back = quote_to_base(quote, price, mult).unwrap();
        assert!(back <= size);
    }

    #[test]
    fn test_quote_to_base_budget_rescale() {
        // budget 500 at maker price 100 buys 5 * 10^8 base
        let mult = pow10(8);
        let back = quote_to_base(U256::from(500u64), U256::from(100u64), mult).unwrap();
        assert_eq!(back, U256::from(5u64) * mult);
    }

    #[test]
    fn test_zero_price_is_rejected() {
        let err = quote_to_base(U256::from(1u64), U256::ZERO, pow10(8)).unwrap_err();
        assert!(matches!(err, EngineError::InternalInvariant(_)));
    }

    #[test]
    fn test_overflow_is_reported() {
        let err = base_to_quote(U256::MAX, U256::from(2u64), pow10(8)).unwrap_err();
        assert!(matches!(err, EngineError::InternalInvariant(_)));
    }
}
