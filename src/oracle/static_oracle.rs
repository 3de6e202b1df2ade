//! In-memory oracle backed by operator-supplied quotes.
//!
//! This is the oracle used when prices arrive through an external feed
//! process that pushes updates into the engine host. Each push overwrites
//! the stored quote; staleness checking happens at read time against the
//! engine's window, not here.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::core::asset::AssetId;
use crate::error::{Error, Result};
use crate::oracle::quote::{PriceOracle, PriceQuote};
use crate::utils::constants::STAB_BASE_UNIT;

/// Oracle serving the most recently pushed quote per asset
#[derive(Debug, Default)]
pub struct StaticOracle {
    quotes: RwLock<HashMap<AssetId, PriceQuote>>,
}

impl StaticOracle {
    /// Create an empty oracle
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an oracle pre-seeded with the stablecoin at its peg.
    ///
    /// Liquidation pricing needs a stablecoin quote; most deployments
    /// treat it as exactly one until a de-peg feed exists.
    pub fn with_peg(now: u64) -> Self {
        let oracle = Self::new();
        oracle.set_price(AssetId::stablecoin(), STAB_BASE_UNIT, now);
        oracle
    }

    /// Push a quote, replacing any previous one for the asset
    pub fn set_price(&self, asset: AssetId, price: u64, timestamp: u64) {
        let quote = PriceQuote::new(asset.clone(), price, timestamp);
        if let Ok(mut quotes) = self.quotes.write() {
            quotes.insert(asset, quote);
        }
    }

    /// Remove the quote for an asset
    pub fn clear_price(&self, asset: &AssetId) {
        if let Ok(mut quotes) = self.quotes.write() {
            quotes.remove(asset);
        }
    }

    /// Number of assets with a stored quote
    pub fn len(&self) -> usize {
        self.quotes.read().map(|q| q.len()).unwrap_or(0)
    }

    /// Whether no quotes are stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PriceOracle for StaticOracle {
    fn get_price(&self, asset: &AssetId) -> Result<PriceQuote> {
        let quotes = self.quotes.read().map_err(|_| Error::Lock)?;
        quotes
            .get(asset)
            .cloned()
            .ok_or_else(|| Error::PriceUnavailable {
                asset: asset.to_string(),
            })
    }
}
