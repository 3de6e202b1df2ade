//! Liquidation of undercollateralized positions.
//!
//! Detection finds positions priced below the threshold and orders them
//! worst first; execution repays debt, seizes bonus-adjusted collateral,
//! and retires positions stripped bare.

pub mod executor;

pub use executor::{liquidate, scan_liquidatable, seizure_amounts, LiquidationOutcome};
