//! Input validation utilities for the rUSD engine.
//!
//! This module provides validation functions to ensure inputs meet
//! engine requirements before processing.

use crate::error::{Error, Result};
use crate::utils::constants::*;

// ═══════════════════════════════════════════════════════════════════════════════
// AMOUNT VALIDATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Validate that an amount is non-zero
pub fn validate_non_zero(amount: u64) -> Result<()> {
    if amount == 0 {
        return Err(Error::ZeroAmount);
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// ASSET VALIDATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Validate an asset identifier: non-empty ASCII alphanumeric, bounded length
pub fn validate_asset_symbol(symbol: &str) -> Result<()> {
    if symbol.is_empty() {
        return Err(Error::InvalidParameter {
            name: "asset_id".into(),
            reason: "identifier cannot be empty".into(),
        });
    }

    if symbol.len() > MAX_ASSET_ID_LENGTH {
        return Err(Error::InvalidParameter {
            name: "asset_id".into(),
            reason: format!(
                "identifier {} exceeds {} bytes",
                symbol, MAX_ASSET_ID_LENGTH
            ),
        });
    }

    if !symbol.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
        return Err(Error::InvalidParameter {
            name: "asset_id".into(),
            reason: format!("identifier {} contains non-alphanumeric bytes", symbol),
        });
    }

    Ok(())
}

/// Validate declared asset decimals
pub fn validate_decimals(decimals: u8) -> Result<()> {
    if decimals > MAX_ASSET_DECIMALS {
        return Err(Error::InvalidParameter {
            name: "decimals".into(),
            reason: format!("{} exceeds maximum {}", decimals, MAX_ASSET_DECIMALS),
        });
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// RATIO VALIDATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Validate a collateral ratio against the 100% floor
pub fn validate_ratio_floor(ratio_bps: u64) -> Result<()> {
    if ratio_bps < RATIO_FLOOR_BPS {
        return Err(Error::RatioTooLow {
            requested: ratio_bps,
            floor: RATIO_FLOOR_BPS,
        });
    }
    Ok(())
}

/// Validate that a ratio is within sane bounds
pub fn validate_ratio_bounds(ratio_bps: u64) -> Result<()> {
    validate_ratio_floor(ratio_bps)?;
    if ratio_bps > MAX_RATIO_BPS {
        return Err(Error::InvalidParameter {
            name: "ratio_bps".into(),
            reason: format!("ratio {} exceeds maximum {}", ratio_bps, MAX_RATIO_BPS),
        });
    }
    Ok(())
}

/// Validate a liquidation bonus
pub fn validate_bonus(bonus_bps: u64) -> Result<()> {
    if bonus_bps > MAX_LIQUIDATION_BONUS_BPS {
        return Err(Error::InvalidParameter {
            name: "bonus_bps".into(),
            reason: format!(
                "bonus {} exceeds maximum {}",
                bonus_bps, MAX_LIQUIDATION_BONUS_BPS
            ),
        });
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// PRICE VALIDATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Validate a quote is within sane bounds
pub fn validate_price_sane(price: u64) -> Result<()> {
    if price < MIN_SANE_PRICE || price > MAX_SANE_PRICE {
        return Err(Error::PriceOutOfBounds {
            price,
            min: MIN_SANE_PRICE,
            max: MAX_SANE_PRICE,
        });
    }
    Ok(())
}

/// Validate a quote timestamp against the staleness window
pub fn validate_quote_freshness(
    asset: &str,
    timestamp: u64,
    now: u64,
    max_age_secs: u64,
) -> Result<()> {
    if now < timestamp {
        return Err(Error::InvalidParameter {
            name: "timestamp".into(),
            reason: "quote timestamp is in the future".into(),
        });
    }

    let age = now - timestamp;
    if age > max_age_secs {
        return Err(Error::StalePrice {
            asset: asset.to_string(),
            age_secs: age,
            max_age_secs,
        });
    }

    Ok(())
}

/// Validate a configured staleness window
pub fn validate_staleness_window(secs: u64) -> Result<()> {
    if secs < MIN_PRICE_STALENESS_SECS || secs > MAX_PRICE_STALENESS_SECS {
        return Err(Error::InvalidParameter {
            name: "staleness_window".into(),
            reason: format!(
                "{} outside bounds [{}, {}]",
                secs, MIN_PRICE_STALENESS_SECS, MAX_PRICE_STALENESS_SECS
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_non_zero() {
        assert!(validate_non_zero(1).is_ok());
        assert_eq!(validate_non_zero(0), Err(Error::ZeroAmount));
    }

    #[test]
    fn test_validate_asset_symbol() {
        assert!(validate_asset_symbol("WETH").is_ok());
        assert!(validate_asset_symbol("USDC-E").is_ok());
        assert!(validate_asset_symbol("").is_err());
        assert!(validate_asset_symbol("THIS-IDENTIFIER-IS-TOO-LONG").is_err());
        assert!(validate_asset_symbol("BAD SYMBOL").is_err());
        assert!(validate_asset_symbol("weth!").is_err());
    }

    #[test]
    fn test_validate_decimals() {
        assert!(validate_decimals(0).is_ok());
        assert!(validate_decimals(MAX_ASSET_DECIMALS).is_ok());
        assert!(validate_decimals(MAX_ASSET_DECIMALS + 1).is_err());
    }

    #[test]
    fn test_validate_ratio_floor() {
        assert!(validate_ratio_floor(RATIO_FLOOR_BPS).is_ok());
        assert!(validate_ratio_floor(15_000).is_ok());

        let err = validate_ratio_floor(9_999).unwrap_err();
        assert!(matches!(err, Error::RatioTooLow { requested: 9_999, .. }));
    }

    #[test]
    fn test_validate_ratio_bounds() {
        assert!(validate_ratio_bounds(15_000).is_ok());
        assert!(validate_ratio_bounds(MAX_RATIO_BPS).is_ok());
        assert!(validate_ratio_bounds(MAX_RATIO_BPS + 1).is_err());
        assert!(validate_ratio_bounds(5_000).is_err());
    }

    #[test]
    fn test_validate_bonus() {
        assert!(validate_bonus(0).is_ok());
        assert!(validate_bonus(DEFAULT_LIQUIDATION_BONUS_BPS).is_ok());
        assert!(validate_bonus(MAX_LIQUIDATION_BONUS_BPS + 1).is_err());
    }

    #[test]
    fn test_validate_price_sane() {
        assert!(validate_price_sane(STAB_BASE_UNIT).is_ok());
        assert!(validate_price_sane(0).is_err());
        assert!(validate_price_sane(MAX_SANE_PRICE + 1).is_err());
    }

    #[test]
    fn test_validate_quote_freshness() {
        let now = 1_000_000;

        // Fresh quote (10 seconds old)
        assert!(validate_quote_freshness("WETH", now - 10, now, 3_600).is_ok());

        // Stale quote
        let err = validate_quote_freshness("WETH", now - 7_200, now, 3_600).unwrap_err();
        assert!(matches!(err, Error::StalePrice { age_secs: 7_200, .. }));

        // Future quote (invalid)
        assert!(validate_quote_freshness("WETH", now + 1, now, 3_600).is_err());
    }

    #[test]
    fn test_validate_staleness_window() {
        assert!(validate_staleness_window(DEFAULT_PRICE_STALENESS_SECS).is_ok());
        assert!(validate_staleness_window(MIN_PRICE_STALENESS_SECS - 1).is_err());
        assert!(validate_staleness_window(MAX_PRICE_STALENESS_SECS + 1).is_err());
    }
}
