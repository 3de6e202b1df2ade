//! Collateral asset definitions and the asset registry.
//!
//! Each reserve asset carries its own decimals and required collateral
//! ratio. The registry keeps every asset ever registered in a stable slot;
//! assets are deactivated rather than removed, so historical records and
//! open positions keep resolving.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::core::amount::AssetAmount;
use crate::error::{Error, Result};
use crate::oracle::quote::PriceQuote;
use crate::utils::constants::*;
use crate::utils::math::collateral_value;
use crate::utils::validation::{validate_asset_symbol, validate_decimals, validate_ratio_bounds};

// ═══════════════════════════════════════════════════════════════════════════════
// ASSET ID
// ═══════════════════════════════════════════════════════════════════════════════

/// Validated asset symbol, e.g. "WBTC" or "USDC-V2"
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId(String);

impl AssetId {
    /// Create a validated asset identifier.
    ///
    /// Symbols are 1 to 16 ASCII alphanumeric characters or hyphens.
    pub fn new(symbol: &str) -> Result<Self> {
        validate_asset_symbol(symbol)?;
        Ok(Self(symbol.to_string()))
    }

    /// Identifier of the stablecoin itself, used for reserve reporting
    pub fn stablecoin() -> Self {
        Self(STAB_ASSET_ID.to_string())
    }

    /// Get the symbol as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COLLATERAL ASSET
// ═══════════════════════════════════════════════════════════════════════════════

/// A registered reserve asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollateralAsset {
    /// Asset identifier
    pub id: AssetId,
    /// Number of decimals in the asset's base unit
    pub decimals: u8,
    /// Required collateral ratio for issuance against this asset (basis points)
    pub ratio_bps: u64,
    /// Whether new deposits and issuance are accepted
    pub active: bool,
    /// Units currently held in reserve
    pub balance: AssetAmount,
    /// Lifetime units deposited
    pub lifetime_deposited: AssetAmount,
    /// Lifetime units withdrawn (including seizures)
    pub lifetime_withdrawn: AssetAmount,
    /// Most recent quote applied by an operation, kept for reporting
    pub last_price: Option<PriceQuote>,
    /// Unix timestamp of registration
    pub added_at: u64,
    /// Unix timestamp of last configuration change
    pub updated_at: u64,
}

impl CollateralAsset {
    /// Create a new asset with validated parameters
    pub fn new(id: AssetId, decimals: u8, ratio_bps: u64, now: u64) -> Result<Self> {
        validate_decimals(decimals)?;
        validate_ratio_bounds(ratio_bps)?;

        Ok(Self {
            id,
            decimals,
            ratio_bps,
            active: true,
            balance: AssetAmount::ZERO,
            lifetime_deposited: AssetAmount::ZERO,
            lifetime_withdrawn: AssetAmount::ZERO,
            last_price: None,
            added_at: now,
            updated_at: now,
        })
    }

    /// Value of an amount of this asset in stablecoin micro-units
    ///
    /// `price` is stablecoin micro-units per whole asset unit.
    pub fn value_of(&self, amount: AssetAmount, price: u64) -> Result<u64> {
        collateral_value(amount.units(), price, self.decimals)
    }

    /// Value of the full reserve balance of this asset
    pub fn balance_value(&self, price: u64) -> Result<u64> {
        self.value_of(self.balance, price)
    }

    /// Record the quote an operation priced this asset with
    pub fn note_price(&mut self, quote: PriceQuote) {
        self.last_price = Some(quote);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ASSET REGISTRY
// ═══════════════════════════════════════════════════════════════════════════════

/// Registry of all reserve assets
///
/// Slots are append-only. An asset keeps its slot for the lifetime of the
/// engine; deactivation only flips its `active` flag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetRegistry {
    slots: Vec<CollateralAsset>,
    index: HashMap<AssetId, usize>,
}

impl AssetRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new asset
    ///
    /// Fails if the identifier is already taken, even by a deactivated
    /// asset. Deactivated assets are reactivated, not re-registered.
    pub fn register(&mut self, asset: CollateralAsset) -> Result<()> {
        if self.index.contains_key(&asset.id) {
            return Err(Error::AssetAlreadyExists(asset.id.to_string()));
        }

        tracing::info!(
            asset = %asset.id,
            decimals = asset.decimals,
            ratio_bps = asset.ratio_bps,
            "asset registered"
        );

        self.index.insert(asset.id.clone(), self.slots.len());
        self.slots.push(asset);
        Ok(())
    }

    /// Get an asset by identifier
    pub fn get(&self, id: &AssetId) -> Option<&CollateralAsset> {
        self.index.get(id).map(|&i| &self.slots[i])
    }

    /// Get a mutable asset by identifier
    pub fn get_mut(&mut self, id: &AssetId) -> Option<&mut CollateralAsset> {
        self.index.get(id).copied().map(move |i| &mut self.slots[i])
    }

    /// Get an asset, failing if unknown
    pub fn require(&self, id: &AssetId) -> Result<&CollateralAsset> {
        self.get(id)
            .ok_or_else(|| Error::InvalidAsset(id.to_string()))
    }

    /// Get a mutable asset, failing if unknown
    pub fn require_mut(&mut self, id: &AssetId) -> Result<&mut CollateralAsset> {
        let i = *self
            .index
            .get(id)
            .ok_or_else(|| Error::InvalidAsset(id.to_string()))?;
        Ok(&mut self.slots[i])
    }

    /// Get an asset, failing if unknown or deactivated
    pub fn require_active(&self, id: &AssetId) -> Result<&CollateralAsset> {
        let asset = self.require(id)?;
        if !asset.active {
            return Err(Error::InvalidAsset(format!("{} is deactivated", id)));
        }
        Ok(asset)
    }

    /// Deactivate an asset.
    ///
    /// Existing holdings remain withdrawable and liquidatable; only new
    /// deposits and new issuance against the asset stop.
    pub fn deactivate(&mut self, id: &AssetId, now: u64) -> Result<()> {
        let asset = self.require_mut(id)?;
        if !asset.active {
            return Err(Error::InvalidParameter {
                name: "asset".into(),
                reason: format!("{} is already deactivated", id),
            });
        }
        asset.active = false;
        asset.updated_at = now;
        tracing::warn!(asset = %id, "asset deactivated");
        Ok(())
    }

    /// Reactivate a previously deactivated asset
    pub fn reactivate(&mut self, id: &AssetId, now: u64) -> Result<()> {
        let asset = self.require_mut(id)?;
        if asset.active {
            return Err(Error::InvalidParameter {
                name: "asset".into(),
                reason: format!("{} is already active", id),
            });
        }
        asset.active = true;
        asset.updated_at = now;
        tracing::info!(asset = %id, "asset reactivated");
        Ok(())
    }

    /// Change the required collateral ratio for an asset
    pub fn set_ratio(&mut self, id: &AssetId, ratio_bps: u64, now: u64) -> Result<u64> {
        validate_ratio_bounds(ratio_bps)?;
        let asset = self.require_mut(id)?;
        let previous = asset.ratio_bps;
        asset.ratio_bps = ratio_bps;
        asset.updated_at = now;
        Ok(previous)
    }

    /// Iterate over all registered assets
    pub fn iter(&self) -> impl Iterator<Item = &CollateralAsset> {
        self.slots.iter()
    }

    /// Iterate over active assets only
    pub fn iter_active(&self) -> impl Iterator<Item = &CollateralAsset> {
        self.slots.iter().filter(|a| a.active)
    }

    /// Number of registered assets (active and deactivated)
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no assets are registered
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of active assets
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|a| a.active).count()
    }
}
