//! Core modules for the rUSD engine.
//!
//! This module contains the fundamental building blocks:
//! - Actor identities and capability grants
//! - Typed stablecoin and collateral amounts
//! - Collateral asset registry
//! - Position accounting
//! - Engine configuration and parameters

pub mod actor;
pub mod amount;
pub mod asset;
pub mod config;
pub mod position;

pub use actor::*;
pub use amount::*;
pub use asset::*;
pub use config::*;
pub use position::*;
