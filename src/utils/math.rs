//! Checked arithmetic and ratio calculations.
//!
//! All financial math in the engine goes through these helpers: u128
//! intermediates for products, explicit overflow errors on narrowing, and
//! basis-point ratio arithmetic.

use crate::error::{Error, Result};
use crate::utils::constants::{BPS_DIVISOR, RATIO_UNDEFINED};

// ═══════════════════════════════════════════════════════════════════════════════
// SAFE ARITHMETIC OPERATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Safe addition with overflow check
pub fn safe_add(a: u64, b: u64) -> Result<u64> {
    a.checked_add(b).ok_or(Error::Overflow {
        operation: format!("{} + {}", a, b),
    })
}

/// Safe subtraction with underflow check
pub fn safe_sub(a: u64, b: u64) -> Result<u64> {
    a.checked_sub(b).ok_or(Error::Underflow {
        operation: format!("{} - {}", a, b),
    })
}

/// Safe multiplication with overflow check
pub fn safe_mul(a: u64, b: u64) -> Result<u64> {
    a.checked_mul(b).ok_or(Error::Overflow {
        operation: format!("{} * {}", a, b),
    })
}

/// Safe division with zero check
pub fn safe_div(a: u64, b: u64) -> Result<u64> {
    if b == 0 {
        return Err(Error::InvalidParameter {
            name: "divisor".into(),
            reason: "division by zero".into(),
        });
    }
    Ok(a / b)
}

/// Safe multiplication then division (for better precision)
/// Computes (a * b) / c with u128 intermediate to prevent overflow
pub fn safe_mul_div(a: u64, b: u64, c: u64) -> Result<u64> {
    if c == 0 {
        return Err(Error::InvalidParameter {
            name: "divisor".into(),
            reason: "division by zero".into(),
        });
    }
    let result = (a as u128) * (b as u128) / (c as u128);
    if result > u64::MAX as u128 {
        return Err(Error::Overflow {
            operation: format!("({} * {}) / {}", a, b, c),
        });
    }
    Ok(result as u64)
}

/// Safe multiplication then division, rounding up
pub fn safe_mul_div_up(a: u64, b: u64, c: u64) -> Result<u64> {
    if c == 0 {
        return Err(Error::InvalidParameter {
            name: "divisor".into(),
            reason: "division by zero".into(),
        });
    }
    let numerator = (a as u128) * (b as u128);
    let result = (numerator + (c as u128) - 1) / (c as u128);
    if result > u64::MAX as u128 {
        return Err(Error::Overflow {
            operation: format!("ceil(({} * {}) / {})", a, b, c),
        });
    }
    Ok(result as u64)
}

/// Power of ten for decimal scaling (valid through 10^18)
pub fn pow10(decimals: u8) -> Result<u64> {
    if decimals > 18 {
        return Err(Error::InvalidParameter {
            name: "decimals".into(),
            reason: format!("{} exceeds maximum of 18", decimals),
        });
    }
    Ok(10u64.pow(decimals as u32))
}

// ═══════════════════════════════════════════════════════════════════════════════
// COLLATERALIZATION CALCULATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Value of a collateral amount in stablecoin micro-units
///
/// # Arguments
/// * `amount` - Amount in the asset's base units
/// * `price` - Stablecoin micro-units per whole unit of the asset
/// * `decimals` - The asset's declared decimals
pub fn collateral_value(amount: u64, price: u64, decimals: u8) -> Result<u64> {
    safe_mul_div(amount, price, pow10(decimals)?)
}

/// Collateralization ratio in basis points
///
/// # Arguments
/// * `collateral_value` - Collateral value in stablecoin micro-units
/// * `debt` - Debt in stablecoin micro-units
///
/// # Returns
/// Ratio in basis points (15000 = 150%); `RATIO_UNDEFINED` if debt is zero
/// or the ratio exceeds the representable range
pub fn collateral_ratio_bps(collateral_value: u64, debt: u64) -> u64 {
    if debt == 0 {
        return RATIO_UNDEFINED;
    }

    let ratio = (collateral_value as u128) * (BPS_DIVISOR as u128) / (debt as u128);
    if ratio > u64::MAX as u128 {
        return RATIO_UNDEFINED;
    }

    ratio as u64
}

/// Maximum stablecoin issuance for a collateral value at a given ratio
///
/// # Arguments
/// * `collateral_value` - Collateral value in stablecoin micro-units
/// * `ratio_bps` - Required collateralization ratio in basis points
pub fn max_issuable(collateral_value: u64, ratio_bps: u64) -> Result<u64> {
    if ratio_bps == 0 {
        return Err(Error::InvalidParameter {
            name: "ratio_bps".into(),
            reason: "cannot be zero".into(),
        });
    }
    safe_mul_div(collateral_value, BPS_DIVISOR, ratio_bps)
}

/// Collateral value released when burning stablecoin at a given ratio
///
/// Inverse of [`max_issuable`]: burning `stab_amount` frees the value that
/// backed it at `ratio_bps`.
pub fn release_value(stab_amount: u64, ratio_bps: u64) -> Result<u64> {
    safe_mul_div(stab_amount, ratio_bps, BPS_DIVISOR)
}

/// Convert a stablecoin value back to asset base units at a price
///
/// Rounds down, so conversions never credit more units than the value
/// covers.
pub fn units_for_value(value: u64, price: u64, decimals: u8) -> Result<u64> {
    if price == 0 {
        return Err(Error::InvalidParameter {
            name: "price".into(),
            reason: "cannot be zero".into(),
        });
    }
    safe_mul_div(value, pow10(decimals)?, price)
}

/// Apply a basis-point bonus on top of a value
pub fn value_with_bonus(value: u64, bonus_bps: u64) -> Result<u64> {
    safe_mul_div(value, safe_add(BPS_DIVISOR, bonus_bps)?, BPS_DIVISOR)
}
