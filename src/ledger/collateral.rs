//! Reserve-side collateral bookkeeping.
//!
//! The collateral ledger owns the asset registry and the per-asset balance
//! counters. Every unit entering or leaving custody flows through
//! `record_deposit` or `record_withdrawal`, so the registry balances always
//! equal the sum of position holdings.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::amount::AssetAmount;
use crate::core::asset::{AssetId, AssetRegistry, CollateralAsset};
use crate::core::position::PositionManager;
use crate::error::{Error, Result};
use crate::oracle::quote::QuoteSet;
use crate::utils::math::safe_add;

/// Registry plus flow accounting for all reserve collateral
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollateralLedger {
    registry: AssetRegistry,
}

impl CollateralLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // REGISTRY MANAGEMENT
    // ═══════════════════════════════════════════════════════════════════════════

    /// Read access to the asset registry
    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    /// Register a new asset
    pub fn register_asset(&mut self, asset: CollateralAsset) -> Result<()> {
        self.registry.register(asset)
    }

    /// Deactivate an asset
    pub fn deactivate_asset(&mut self, id: &AssetId, now: u64) -> Result<()> {
        self.registry.deactivate(id, now)
    }

    /// Reactivate an asset
    pub fn reactivate_asset(&mut self, id: &AssetId, now: u64) -> Result<()> {
        self.registry.reactivate(id, now)
    }

    /// Change an asset's required ratio, returning the previous value
    pub fn set_asset_ratio(&mut self, id: &AssetId, ratio_bps: u64, now: u64) -> Result<u64> {
        self.registry.set_ratio(id, ratio_bps, now)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // FLOW ACCOUNTING
    // ═══════════════════════════════════════════════════════════════════════════

    /// Book units entering custody
    pub fn record_deposit(&mut self, id: &AssetId, amount: AssetAmount) -> Result<()> {
        let asset = self.registry.require_mut(id)?;

        asset.balance = asset.balance.checked_add(amount).ok_or(Error::Overflow {
            operation: "reserve balance".into(),
        })?;
        asset.lifetime_deposited = asset
            .lifetime_deposited
            .checked_add(amount)
            .ok_or(Error::Overflow {
                operation: "lifetime deposited".into(),
            })?;
        Ok(())
    }

    /// Book units leaving custody (withdrawals and seizures)
    pub fn record_withdrawal(&mut self, id: &AssetId, amount: AssetAmount) -> Result<()> {
        let asset = self.registry.require_mut(id)?;

        if amount > asset.balance {
            return Err(Error::InsufficientCollateral {
                required: amount.units(),
                available: asset.balance.units(),
            });
        }

        asset.balance = asset.balance.saturating_sub(amount);
        asset.lifetime_withdrawn = asset
            .lifetime_withdrawn
            .checked_add(amount)
            .ok_or(Error::Overflow {
                operation: "lifetime withdrawn".into(),
            })?;
        Ok(())
    }

    /// Overwrite an asset's balance after an external custody audit.
    ///
    /// Returns `(previous, new)`. Lifetime counters are left untouched;
    /// they track operation flow, not corrections.
    pub fn set_balance(
        &mut self,
        id: &AssetId,
        observed: AssetAmount,
    ) -> Result<(AssetAmount, AssetAmount)> {
        let asset = self.registry.require_mut(id)?;
        let previous = asset.balance;
        asset.balance = observed;

        tracing::warn!(
            asset = %id,
            previous = previous.units(),
            observed = observed.units(),
            "reserve balance adjusted"
        );
        Ok((previous, observed))
    }

    /// Stamp each registered asset with the quote an operation used.
    ///
    /// Quotes for unregistered assets (the stablecoin's own, in particular)
    /// are ignored.
    pub fn note_quotes(&mut self, quotes: &QuoteSet) {
        for quote in quotes.iter() {
            if let Some(asset) = self.registry.get_mut(&quote.asset) {
                asset.note_price(quote.clone());
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // VALUATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Total value of all reserve holdings in stablecoin micro-units.
    ///
    /// Computed fresh from balances and the supplied quotes on every call;
    /// nothing is cached. Deactivated assets still count while they hold a
    /// balance. Assets with a zero balance need no quote.
    pub fn reserve_value(&self, quotes: &QuoteSet) -> Result<u64> {
        let mut total = 0u64;
        for asset in self.registry.iter() {
            if asset.balance.is_zero() {
                continue;
            }
            let value = asset.balance_value(quotes.price_of(&asset.id)?)?;
            total = safe_add(total, value)?;
        }
        Ok(total)
    }

    /// Total reserve value with one asset's balance replaced by a
    /// hypothetical amount. Used to test an invariant against the state a
    /// release would produce, before any balance changes.
    pub fn reserve_value_with(
        &self,
        quotes: &QuoteSet,
        override_id: &AssetId,
        override_balance: AssetAmount,
    ) -> Result<u64> {
        self.registry.require(override_id)?;
        let mut total = 0u64;
        for asset in self.registry.iter() {
            let balance = if &asset.id == override_id {
                override_balance
            } else {
                asset.balance
            };
            if balance.is_zero() {
                continue;
            }
            let value = asset.value_of(balance, quotes.price_of(&asset.id)?)?;
            total = safe_add(total, value)?;
        }
        Ok(total)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CONSISTENCY
    // ═══════════════════════════════════════════════════════════════════════════

    /// Check that registry balances equal the sum of position holdings
    pub fn verify_holdings(&self, positions: &PositionManager) -> bool {
        let mut summed: HashMap<&AssetId, u64> = HashMap::new();
        for position in positions.iter() {
            for (asset, amount) in &position.holdings {
                let entry = summed.entry(asset).or_insert(0);
                *entry = entry.saturating_add(amount.units());
            }
        }

        for asset in self.registry.iter() {
            let held = summed.remove(&asset.id).unwrap_or(0);
            if held != asset.balance.units() {
                return false;
            }
        }

        // Holdings in an asset the registry does not know about
        summed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::actor::ActorId;
    use crate::oracle::quote::PriceQuote;

    fn ledger_with_assets() -> CollateralLedger {
        let mut ledger = CollateralLedger::new();
        ledger
            .register_asset(
                CollateralAsset::new(AssetId::new("WBTC").unwrap(), 8, 15_000, 0).unwrap(),
            )
            .unwrap();
        ledger
            .register_asset(
                CollateralAsset::new(AssetId::new("USDC").unwrap(), 6, 11_000, 0).unwrap(),
            )
            .unwrap();
        ledger
    }

    fn wbtc() -> AssetId {
        AssetId::new("WBTC").unwrap()
    }

    fn usdc() -> AssetId {
        AssetId::new("USDC").unwrap()
    }

    #[test]
    fn test_deposit_withdrawal_counters() {
        let mut ledger = ledger_with_assets();

        ledger.record_deposit(&wbtc(), AssetAmount::from_units(100_000_000)).unwrap();
        ledger.record_withdrawal(&wbtc(), AssetAmount::from_units(40_000_000)).unwrap();

        let asset = ledger.registry().require(&wbtc()).unwrap();
        assert_eq!(asset.balance.units(), 60_000_000);
        assert_eq!(asset.lifetime_deposited.units(), 100_000_000);
        assert_eq!(asset.lifetime_withdrawn.units(), 40_000_000);
    }

    #[test]
    fn test_withdrawal_beyond_balance_fails() {
        let mut ledger = ledger_with_assets();
        ledger.record_deposit(&wbtc(), AssetAmount::from_units(10)).unwrap();

        let result = ledger.record_withdrawal(&wbtc(), AssetAmount::from_units(11));
        assert!(matches!(result, Err(Error::InsufficientCollateral { .. })));
    }

    #[test]
    fn test_reserve_value_sums_assets() {
        let mut ledger = ledger_with_assets();

        // 1 WBTC at 65,000 and 500 USDC at 1
        ledger.record_deposit(&wbtc(), AssetAmount::from_units(100_000_000)).unwrap();
        ledger.record_deposit(&usdc(), AssetAmount::from_units(500_000_000)).unwrap();

        let mut quotes = QuoteSet::new();
        quotes.insert(PriceQuote::new(wbtc(), 65_000_000_000, 0));
        quotes.insert(PriceQuote::new(usdc(), 1_000_000, 0));

        let value = ledger.reserve_value(&quotes).unwrap();
        assert_eq!(value, 65_000_000_000 + 500_000_000);
    }

    #[test]
    fn test_reserve_value_needs_quotes_for_held_assets() {
        let mut ledger = ledger_with_assets();
        ledger.record_deposit(&wbtc(), AssetAmount::from_units(1)).unwrap();

        // No WBTC quote supplied
        let mut quotes = QuoteSet::new();
        quotes.insert(PriceQuote::new(usdc(), 1_000_000, 0));

        assert!(matches!(
            ledger.reserve_value(&quotes),
            Err(Error::PriceUnavailable { .. })
        ));

        // Zero-balance assets need none
        ledger.record_withdrawal(&wbtc(), AssetAmount::from_units(1)).unwrap();
        assert_eq!(ledger.reserve_value(&quotes).unwrap(), 0);
    }

    #[test]
    fn test_deactivated_asset_still_counts() {
        let mut ledger = ledger_with_assets();
        ledger.record_deposit(&wbtc(), AssetAmount::from_units(100_000_000)).unwrap();
        ledger.deactivate_asset(&wbtc(), 10).unwrap();

        let mut quotes = QuoteSet::new();
        quotes.insert(PriceQuote::new(wbtc(), 65_000_000_000, 0));

        assert_eq!(ledger.reserve_value(&quotes).unwrap(), 65_000_000_000);
    }

    #[test]
    fn test_set_balance_returns_previous() {
        let mut ledger = ledger_with_assets();
        ledger.record_deposit(&wbtc(), AssetAmount::from_units(1_000)).unwrap();

        let (previous, updated) = ledger
            .set_balance(&wbtc(), AssetAmount::from_units(900))
            .unwrap();
        assert_eq!(previous.units(), 1_000);
        assert_eq!(updated.units(), 900);
        assert_eq!(
            ledger.registry().require(&wbtc()).unwrap().balance.units(),
            900
        );
        // Flow counters unchanged
        assert_eq!(
            ledger
                .registry()
                .require(&wbtc())
                .unwrap()
                .lifetime_deposited
                .units(),
            1_000
        );
    }

    #[test]
    fn test_verify_holdings() {
        let mut ledger = ledger_with_assets();
        let mut positions = PositionManager::new();

        let alice = ActorId::derive("alice");
        positions
            .open_or_get(alice, 0)
            .deposit(wbtc(), AssetAmount::from_units(500), 0)
            .unwrap();
        ledger.record_deposit(&wbtc(), AssetAmount::from_units(500)).unwrap();

        assert!(ledger.verify_holdings(&positions));

        // Drift between the two books is caught
        ledger.record_deposit(&wbtc(), AssetAmount::from_units(1)).unwrap();
        assert!(!ledger.verify_holdings(&positions));
    }
}
