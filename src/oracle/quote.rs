//! Price quotes and the oracle interface.
//!
//! Prices are denominated in stablecoin micro-units per whole asset unit,
//! so a quote of 65_000_000_000 reads as 65,000 rUSD per unit. Every quote
//! carries its own timestamp and is validated against the engine's
//! staleness window before use.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::asset::AssetId;
use crate::error::{Error, Result};
use crate::utils::constants::STAB_BASE_UNIT;
use crate::utils::validation::{validate_price_sane, validate_quote_freshness};

// ═══════════════════════════════════════════════════════════════════════════════
// PRICE QUOTE
// ═══════════════════════════════════════════════════════════════════════════════

/// A single asset price observation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Asset being priced
    pub asset: AssetId,
    /// Price in stablecoin micro-units per whole asset unit
    pub price: u64,
    /// Unix timestamp when the price was observed
    pub timestamp: u64,
}

impl PriceQuote {
    /// Create a new quote
    pub fn new(asset: AssetId, price: u64, timestamp: u64) -> Self {
        Self {
            asset,
            price,
            timestamp,
        }
    }

    /// Age of the quote in seconds
    pub fn age(&self, now: u64) -> u64 {
        now.saturating_sub(self.timestamp)
    }

    /// Check if the quote is within the staleness window
    pub fn is_fresh(&self, now: u64, max_age: u64) -> bool {
        self.age(now) <= max_age
    }

    /// Validate the quote for use: sane price and within the staleness window
    pub fn validate(&self, now: u64, max_age: u64) -> Result<()> {
        validate_price_sane(self.price)?;
        validate_quote_freshness(self.asset.as_str(), self.timestamp, now, max_age)
    }

    /// Format price for display
    pub fn format_price(&self) -> String {
        let whole = self.price / STAB_BASE_UNIT;
        let frac = self.price % STAB_BASE_UNIT;
        format!("{}.{:06}", whole, frac)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ORACLE INTERFACE
// ═══════════════════════════════════════════════════════════════════════════════

/// Source of price quotes.
///
/// Implementations fetch from wherever prices live; the engine only sees
/// this trait. Quotes are fetched and validated before the engine takes
/// its state lock, so implementations are free to block on I/O.
pub trait PriceOracle: Send + Sync {
    /// Get the latest quote for an asset
    fn get_price(&self, asset: &AssetId) -> Result<PriceQuote>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// QUOTE SET
// ═══════════════════════════════════════════════════════════════════════════════

/// A batch of validated quotes covering one operation.
///
/// Assembled before any state is touched so an operation either has every
/// price it needs or fails upfront.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuoteSet {
    quotes: HashMap<AssetId, PriceQuote>,
}

impl QuoteSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a quote to the set
    pub fn insert(&mut self, quote: PriceQuote) {
        self.quotes.insert(quote.asset.clone(), quote);
    }

    /// Get a quote, failing with `PriceUnavailable` if absent
    pub fn get(&self, asset: &AssetId) -> Result<&PriceQuote> {
        self.quotes
            .get(asset)
            .ok_or_else(|| Error::PriceUnavailable {
                asset: asset.to_string(),
            })
    }

    /// Get just the price for an asset
    pub fn price_of(&self, asset: &AssetId) -> Result<u64> {
        Ok(self.get(asset)?.price)
    }

    /// Check whether a quote is present
    pub fn contains(&self, asset: &AssetId) -> bool {
        self.quotes.contains_key(asset)
    }

    /// Number of quotes in the set
    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Iterate over the quotes
    pub fn iter(&self) -> impl Iterator<Item = &PriceQuote> {
        self.quotes.values()
    }
}
