//! Engine constants and magic numbers.
//!
//! All engine-wide constants are defined here for easy auditing and modification.

// ═══════════════════════════════════════════════════════════════════════════════
// STABLECOIN CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// rUSD decimals (micro-units, like USDC base units)
pub const STAB_DECIMALS: u8 = 6;

/// Base unit for rUSD (1 rUSD = 1,000,000 micro-units)
pub const STAB_BASE_UNIT: u64 = 1_000_000;

/// Maximum rUSD supply (1 trillion rUSD in micro-units)
pub const MAX_STAB_SUPPLY: u64 = 1_000_000_000_000 * STAB_BASE_UNIT;

/// Reserved asset identifier for the stablecoin's own oracle quote
pub const STAB_ASSET_ID: &str = "RUSD";

// ═══════════════════════════════════════════════════════════════════════════════
// COLLATERALIZATION CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Basis points divisor (10000 = 100%)
pub const BPS_DIVISOR: u64 = 10_000;

/// Absolute floor for any collateral ratio - 100%
/// A ratio below this would issue more value than is deposited
pub const RATIO_FLOOR_BPS: u64 = 10_000;

/// Default required collateral ratio for the reserve - 150%
pub const DEFAULT_REQUIRED_RATIO_BPS: u64 = 15_000;

/// Default liquidation threshold - 125%
/// Below this ratio a position becomes eligible for liquidation
pub const DEFAULT_LIQUIDATION_THRESHOLD_BPS: u64 = 12_500;

/// Default liquidation bonus - 5%
pub const DEFAULT_LIQUIDATION_BONUS_BPS: u64 = 500;

/// Maximum configurable liquidation bonus - 20%
pub const MAX_LIQUIDATION_BONUS_BPS: u64 = 2_000;

/// Maximum configurable collateral ratio - 1000% (10x)
pub const MAX_RATIO_BPS: u64 = 100_000;

/// Sentinel ratio for positions with zero debt
pub const RATIO_UNDEFINED: u64 = u64::MAX;

/// Default margin above the liquidation threshold within which a position
/// is reported as at risk - 10%
pub const DEFAULT_AT_RISK_MARGIN_BPS: u64 = 1_000;

// ═══════════════════════════════════════════════════════════════════════════════
// ASSET CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Maximum decimals a collateral asset may declare
pub const MAX_ASSET_DECIMALS: u8 = 18;

/// Maximum length of an asset identifier in bytes
pub const MAX_ASSET_ID_LENGTH: usize = 16;

// ═══════════════════════════════════════════════════════════════════════════════
// ORACLE CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Default maximum price staleness in seconds (1 hour)
pub const DEFAULT_PRICE_STALENESS_SECS: u64 = 3_600;

/// Minimum configurable staleness window - 1 minute
pub const MIN_PRICE_STALENESS_SECS: u64 = 60;

/// Maximum configurable staleness window - 1 day
pub const MAX_PRICE_STALENESS_SECS: u64 = 86_400;

/// Minimum sane quote - $0.000001 per whole unit
pub const MIN_SANE_PRICE: u64 = 1;

/// Maximum sane quote - $100 million per whole unit
pub const MAX_SANE_PRICE: u64 = 100_000_000 * STAB_BASE_UNIT;

// ═══════════════════════════════════════════════════════════════════════════════
// IDENTITY CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Length of an actor identity in bytes
pub const ACTOR_ID_LENGTH: usize = 32;

/// Length of a digest in bytes (SHA-256)
pub const DIGEST_LENGTH: usize = 32;
