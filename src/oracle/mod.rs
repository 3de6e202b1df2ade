//! Oracle module for price quotes.
//!
//! This module provides the pricing seam for the engine:
//! - Quote and quote-set types with staleness validation
//! - The [`PriceOracle`] trait implemented by quote providers
//! - An in-memory oracle fed by pushed updates
//!
//! ## Usage
//!
//! ```rust
//! use rusd::core::asset::AssetId;
//! use rusd::oracle::{PriceOracle, StaticOracle};
//!
//! let oracle = StaticOracle::with_peg(1_700_000_000);
//! oracle.set_price(AssetId::new("WBTC").unwrap(), 65_000_000_000, 1_700_000_000);
//!
//! let quote = oracle.get_price(&AssetId::new("WBTC").unwrap()).unwrap();
//! assert_eq!(quote.price, 65_000_000_000);
//! ```

pub mod quote;
pub mod static_oracle;

pub use quote::{PriceOracle, PriceQuote, QuoteSet};
pub use static_oracle::StaticOracle;
