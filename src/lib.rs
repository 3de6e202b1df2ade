//! # rUSD Engine
//!
//! A fiat-collateralized stablecoin accounting engine: reserve-backed
//! issuance, multi-asset collateral bookkeeping, position health evaluation,
//! and liquidation.
//!
//! ## Architecture
//!
//! The engine consists of several core modules:
//!
//! - **Core**: Fundamental types: amounts, assets, actors, positions
//! - **Ledger**: Per-asset collateral bookkeeping and the reserve invariant
//! - **Issuance**: Mint/burn exchange between collateral value and supply
//! - **Health**: Pure collateralization-ratio evaluation
//! - **Liquidation**: Resolution of under-collateralized positions
//! - **Engine**: Orchestration, locking, and the administrative surface
//!
//! The engine owns its bookkeeping only. Prices come from a [`PriceOracle`]
//! collaborator and token balances live in a [`TokenLedger`] collaborator;
//! both are traits with reference implementations shipped in-crate.
//!
//! [`PriceOracle`]: oracle::PriceOracle
//! [`TokenLedger`]: token::TokenLedger
//!
//! ## Example
//!
//! ```rust,ignore
//! use rusd::prelude::*;
//!
//! let engine = ReserveEngine::new(oracle, token, admin);
//! engine.add_collateral_asset(admin, asset.clone(), 2, 15_000, now)?;
//!
//! engine.deposit(actor, &asset, AssetAmount::from_units(100_000), now)?;
//! let minted = engine.mint(actor, &asset, AssetAmount::from_units(100_000), now)?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    trivial_casts,
    unused_lifetimes,
    unused_qualifications
)]

pub mod audit;
pub mod core;
pub mod engine;
pub mod error;
pub mod health;
pub mod issuance;
pub mod ledger;
pub mod liquidation;
pub mod oracle;
pub mod storage;
pub mod token;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::audit::{AuditKind, AuditLog, AuditRecord};
    pub use crate::core::{
        actor::{AccessController, ActorId, Capability},
        amount::{AssetAmount, StableAmount},
        asset::{AssetId, AssetRegistry, CollateralAsset},
        config::{EngineConfig, EngineParams},
        position::{Position, PositionManager},
    };
    pub use crate::engine::{
        AssetReportEntry, CloseOutcome, DepositOutcome, ReserveEngine, ReserveReport,
        WithdrawOutcome,
    };
    pub use crate::error::{Error, Result};
    pub use crate::health::{PositionHealth, PositionStatus};
    pub use crate::issuance::{BurnOutcome, MintOutcome};
    pub use crate::liquidation::LiquidationOutcome;
    pub use crate::oracle::{PriceOracle, PriceQuote, QuoteSet, StaticOracle};
    pub use crate::storage::{EngineSnapshot, FileStore, InMemoryStore, SnapshotStore};
    pub use crate::token::{StableToken, TokenLedger};
}

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name
pub const ENGINE_NAME: &str = "rUSD";
