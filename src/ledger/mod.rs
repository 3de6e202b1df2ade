//! Reserve bookkeeping.
//!
//! Two ledgers back the engine:
//! - Collateral: per-asset balances and flow counters
//! - Reserve: issued-supply counters and the backing invariant

pub mod collateral;
pub mod reserve;

pub use collateral::CollateralLedger;
pub use reserve::{check_reserve_invariant, reserve_ratio_bps, ReserveState};
