//! Strongly-typed amounts.
//!
//! Two unit families flow through the engine and must never be mixed:
//! stablecoin micro-units and collateral-asset base units. Each gets its
//! own newtype with checked arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::utils::constants::{STAB_BASE_UNIT, STAB_DECIMALS};

// ═══════════════════════════════════════════════════════════════════════════════
// STABLECOIN AMOUNT
// ═══════════════════════════════════════════════════════════════════════════════

/// Stablecoin amount in micro-units (1 rUSD = 1,000,000 micro-units)
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct StableAmount(u64);

impl StableAmount {
    /// Zero amount
    pub const ZERO: Self = Self(0);

    /// Create from micro-units
    pub const fn from_micro(micro: u64) -> Self {
        Self(micro)
    }

    /// Create from whole rUSD (for convenience)
    pub const fn from_whole(whole: u64) -> Self {
        Self(whole * STAB_BASE_UNIT)
    }

    /// Get raw micro-unit value
    pub fn micro(&self) -> u64 {
        self.0
    }

    /// Get value in whole rUSD (truncated)
    pub fn whole(&self) -> u64 {
        self.0 / STAB_BASE_UNIT
    }

    /// Get formatted string representation
    pub fn to_string_formatted(&self) -> String {
        let whole = self.0 / STAB_BASE_UNIT;
        let frac = self.0 % STAB_BASE_UNIT;
        format!("{}.{:06} rUSD", whole, frac)
    }

    /// Exact decimal rendering without the unit suffix, e.g. "666.666666".
    ///
    /// Used wherever auditors read values: the audit export and the
    /// reserve report.
    pub fn to_decimal_string(&self) -> String {
        Decimal::from_i128_with_scale(self.0 as i128, STAB_DECIMALS as u32).to_string()
    }

    /// Check if zero
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Saturating addition
    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Saturating subtraction
    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Checked addition
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Checked subtraction
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Minimum of two amounts
    pub fn min(self, other: Self) -> Self {
        Self(self.0.min(other.0))
    }
}

impl std::fmt::Display for StableAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_string_formatted())
    }
}

impl From<u64> for StableAmount {
    fn from(micro: u64) -> Self {
        Self(micro)
    }
}

impl From<StableAmount> for u64 {
    fn from(amount: StableAmount) -> Self {
        amount.0
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ASSET AMOUNT
// ═══════════════════════════════════════════════════════════════════════════════

/// Collateral amount in an asset's base units
///
/// The unit scale is the asset's declared decimals, so display needs the
/// asset record; raw values are what the ledger books.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct AssetAmount(u64);

impl AssetAmount {
    /// Zero amount
    pub const ZERO: Self = Self(0);

    /// Create from base units
    pub const fn from_units(units: u64) -> Self {
        Self(units)
    }

    /// Get raw base-unit value
    pub fn units(&self) -> u64 {
        self.0
    }

    /// Format at a given decimal scale
    pub fn to_string_with_decimals(&self, decimals: u8) -> String {
        if decimals == 0 {
            return format!("{}", self.0);
        }
        let scale = 10u64.pow(decimals as u32);
        let whole = self.0 / scale;
        let frac = self.0 % scale;
        format!("{}.{:0width$}", whole, frac, width = decimals as usize)
    }

    /// Check if zero
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Saturating addition
    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Saturating subtraction
    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Checked addition
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Checked subtraction
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Minimum of two amounts
    pub fn min(self, other: Self) -> Self {
        Self(self.0.min(other.0))
    }
}

impl std::fmt::Display for AssetAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} units", self.0)
    }
}

impl From<u64> for AssetAmount {
    fn from(units: u64) -> Self {
        Self(units)
    }
}

impl From<AssetAmount> for u64 {
    fn from(amount: AssetAmount) -> Self {
        amount.0
    }
}
