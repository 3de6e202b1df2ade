//! Error types for the rUSD engine.
//!
//! This module defines all error kinds returned by the engine. Every
//! failure is a typed result to the caller; nothing is logged and ignored.

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the rUSD engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ═══════════════════════════════════════════════════════════════════
    // Asset & Ledger Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Operation references an unregistered or deactivated collateral asset
    #[error("Invalid asset: {0}")]
    InvalidAsset(String),

    /// Asset is already registered
    #[error("Asset already registered: {0}")]
    AssetAlreadyExists(String),

    /// Withdrawal or seizure would exceed net holdings
    #[error("Insufficient collateral: required {required}, available {available}")]
    InsufficientCollateral {
        /// Required collateral amount in asset base units
        required: u64,
        /// Available collateral amount in asset base units
        available: u64,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Issuance Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Requested collateralization ratio violates the 100% floor
    #[error("Collateral ratio {requested} bps below floor {floor} bps")]
    RatioTooLow {
        /// Requested ratio in basis points
        requested: u64,
        /// Minimum permitted ratio in basis points
        floor: u64,
    },

    /// Burn would release more collateral than is held
    #[error("Insufficient collateral for burn: required {required}, available {available}")]
    InsufficientCollateralForBurn {
        /// Collateral required to honor the release, in asset base units
        required: u64,
        /// Collateral available, in asset base units
        available: u64,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Oracle Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Price quote older than the staleness window
    #[error("Stale price for {asset}: {age_secs}s old, max allowed {max_age_secs}s")]
    StalePrice {
        /// Asset the quote was for
        asset: String,
        /// Age of the quote in seconds
        age_secs: u64,
        /// Maximum allowed age in seconds
        max_age_secs: u64,
    },

    /// Oracle has no quote at all for the asset
    #[error("Price unavailable for {asset}")]
    PriceUnavailable {
        /// Asset with no quote
        asset: String,
    },

    /// Quoted price outside sane bounds
    #[error("Price {price} out of bounds [{min}, {max}]")]
    PriceOutOfBounds {
        /// Quoted price
        price: u64,
        /// Minimum allowed price
        min: u64,
        /// Maximum allowed price
        max: u64,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Position Errors
    // ═══════════════════════════════════════════════════════════════════

    /// No position exists for the actor
    #[error("Position not found for {0}")]
    PositionNotFound(String),

    /// Position is closed or liquidated
    #[error("Position is no longer live: {0}")]
    PositionClosed(String),

    // ═══════════════════════════════════════════════════════════════════
    // Liquidation Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Position is above the liquidation threshold
    #[error("Not liquidatable: ratio {ratio_bps} bps at or above threshold {threshold_bps} bps")]
    NotLiquidatable {
        /// Position ratio in basis points
        ratio_bps: u64,
        /// Liquidation threshold in basis points
        threshold_bps: u64,
    },

    /// Liquidator is the position owner
    #[error("Self-liquidation is forbidden")]
    SelfLiquidationForbidden,

    // ═══════════════════════════════════════════════════════════════════
    // Access & Admin Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Actor lacks the capability for this action
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    /// Invalid input parameter
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Engine is paused
    #[error("Engine is paused")]
    EnginePaused,

    // ═══════════════════════════════════════════════════════════════════
    // Collaborator & Storage Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Token ledger collaborator refused a mint or burn
    #[error("Token ledger rejected the call: {0}")]
    LedgerRejected(String),

    /// Storage backend failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization failed
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ═══════════════════════════════════════════════════════════════════
    // Validation Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Amount is zero
    #[error("Amount cannot be zero")]
    ZeroAmount,

    /// Overflow in calculation
    #[error("Arithmetic overflow in {operation}")]
    Overflow {
        /// Operation that overflowed
        operation: String,
    },

    /// Underflow in calculation
    #[error("Arithmetic underflow in {operation}")]
    Underflow {
        /// Operation that underflowed
        operation: String,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Internal Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Global reserve invariant would be broken; the operation was aborted
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Internal error (should not happen in production)
    #[error("Internal error: {0}")]
    Internal(String),

    /// Lock acquisition failed
    #[error("Failed to acquire lock")]
    Lock,
}

impl Error {
    /// Returns true if this error is recoverable by the caller
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::InsufficientCollateral { .. }
                | Error::InsufficientCollateralForBurn { .. }
                | Error::RatioTooLow { .. }
                | Error::StalePrice { .. }
                | Error::PriceUnavailable { .. }
                | Error::NotLiquidatable { .. }
                | Error::EnginePaused
        )
    }

    /// Returns true if this is a critical error requiring immediate attention
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Error::InvariantViolation(_)
                | Error::Internal(_)
                | Error::Lock
                | Error::Overflow { .. }
                | Error::Underflow { .. }
        )
    }

    /// Returns the error code for external systems
    pub fn code(&self) -> u32 {
        match self {
            // Asset and ledger errors: 1xxx
            Error::InvalidAsset(_) => 1001,
            Error::AssetAlreadyExists(_) => 1002,
            Error::InsufficientCollateral { .. } => 1003,

            // Issuance errors: 2xxx
            Error::RatioTooLow { .. } => 2001,
            Error::InsufficientCollateralForBurn { .. } => 2002,

            // Oracle errors: 3xxx
            Error::StalePrice { .. } => 3001,
            Error::PriceUnavailable { .. } => 3002,
            Error::PriceOutOfBounds { .. } => 3003,

            // Position errors: 4xxx
            Error::PositionNotFound(_) => 4001,
            Error::PositionClosed(_) => 4002,

            // Liquidation errors: 5xxx
            Error::NotLiquidatable { .. } => 5001,
            Error::SelfLiquidationForbidden => 5002,

            // Access and admin errors: 6xxx
            Error::Unauthorized(_) => 6001,
            Error::InvalidParameter { .. } => 6002,
            Error::EnginePaused => 6003,

            // Collaborator and storage errors: 7xxx
            Error::LedgerRejected(_) => 7001,
            Error::Storage(_) => 7002,
            Error::Serialization(_) => 7003,
            Error::Deserialization(_) => 7004,

            // Validation errors: 8xxx
            Error::ZeroAmount => 8001,
            Error::Overflow { .. } => 8002,
            Error::Underflow { .. } => 8003,

            // Internal errors: 9xxx
            Error::InvariantViolation(_) => 9001,
            Error::Internal(_) => 9002,
            Error::Lock => 9003,
        }
    }
}
