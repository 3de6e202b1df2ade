//! Issuance and redemption against reserve collateral.
//!
//! Minting values a named slice of the position's collateral at the asset's
//! required ratio and credits the derived stablecoin amount as debt. Burning
//! runs the inverse computation, retiring debt and releasing collateral of
//! the named asset back to the owner.
//!
//! Both operations take their quotes pre-validated, check every failure mode
//! before touching state, and test the reserve invariant against the state
//! they would produce. A call either applies completely or leaves the books
//! untouched.

use crate::core::actor::ActorId;
use crate::core::amount::{AssetAmount, StableAmount};
use crate::core::asset::AssetId;
use crate::core::config::EngineParams;
use crate::core::position::PositionManager;
use crate::error::{Error, Result};
use crate::health;
use crate::ledger::{check_reserve_invariant, CollateralLedger, ReserveState};
use crate::oracle::quote::QuoteSet;
use crate::utils::math::{max_issuable, release_value, safe_add, safe_sub, units_for_value};
use crate::utils::validation::{validate_non_zero, validate_ratio_floor};

// ═══════════════════════════════════════════════════════════════════════════════
// OUTCOMES
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of a successful issuance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintOutcome {
    /// Stablecoin credited to the position owner
    pub minted: StableAmount,
    /// Value of the collateral the issuance was priced against
    pub value_counted: u64,
    /// Position debt after the issuance
    pub new_debt: StableAmount,
}

/// Result of a successful redemption
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurnOutcome {
    /// Stablecoin retired (requests beyond the outstanding debt are clamped)
    pub burned: StableAmount,
    /// Collateral released back to the owner
    pub released: AssetAmount,
    /// Value of the released collateral
    pub release_value: u64,
    /// Position debt after the burn
    pub new_debt: StableAmount,
}

// ═══════════════════════════════════════════════════════════════════════════════
// MINT
// ═══════════════════════════════════════════════════════════════════════════════

/// Issue stablecoin against `amount` units of a held collateral asset.
///
/// The issuable amount is `value(asset, amount) * 10000 / ratio_bps` using
/// the asset's required ratio. The position must hold at least `amount` of
/// the asset, and its total debt after the mint must stay within the
/// capacity of its full holdings, so repeatedly minting against the same
/// collateral exhausts headroom rather than compounding it.
#[allow(clippy::too_many_arguments)]
pub fn mint_against(
    positions: &mut PositionManager,
    ledger: &CollateralLedger,
    reserve: &mut ReserveState,
    quotes: &QuoteSet,
    params: &EngineParams,
    owner: &ActorId,
    asset_id: &AssetId,
    amount: AssetAmount,
    now: u64,
) -> Result<MintOutcome> {
    validate_non_zero(amount.units())?;

    let asset = ledger.registry().require_active(asset_id)?;
    let ratio_bps = asset.ratio_bps;
    validate_ratio_floor(ratio_bps)?;

    let price = quotes.price_of(asset_id)?;
    let value_counted = asset.value_of(amount, price)?;
    let mintable = max_issuable(value_counted, ratio_bps)?;
    if mintable == 0 {
        return Err(Error::ZeroAmount);
    }

    let position = positions.require(owner)?;
    position.ensure_live()?;

    let held = position.holding(asset_id);
    if held < amount {
        return Err(Error::InsufficientCollateral {
            required: amount.units(),
            available: held.units(),
        });
    }

    // Debt after the mint must fit the whole position's issuance capacity
    let capacity = health::issuance_capacity(position, ledger.registry(), quotes)?;
    let new_debt = safe_add(position.debt.micro(), mintable)?;
    if new_debt > capacity {
        return Err(Error::InsufficientCollateral {
            required: new_debt,
            available: capacity,
        });
    }

    // Reserve value is unchanged by a mint; only the supply side grows
    let reserve_value = ledger.reserve_value(quotes)?;
    let new_total = safe_add(reserve.total_minted().micro(), mintable)?;
    check_reserve_invariant(reserve_value, StableAmount::from_micro(new_total), params.required_ratio_bps)?;

    let minted = StableAmount::from_micro(mintable);
    reserve.record_mint(minted, params.supply_ceiling_micro)?;
    positions.require_live_mut(owner)?.add_debt(minted, now)?;

    tracing::info!(
        owner = %owner.short(),
        asset = %asset_id,
        collateral = amount.units(),
        minted = mintable,
        ratio_bps,
        "stablecoin minted"
    );

    Ok(MintOutcome {
        minted,
        value_counted,
        new_debt: StableAmount::from_micro(new_debt),
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// BURN
// ═══════════════════════════════════════════════════════════════════════════════

/// Retire stablecoin debt and release collateral of the named asset.
///
/// The release is the mint computation run backwards: burning `s` micro-units
/// frees `s * ratio_bps / 10000` of value, converted to asset units at the
/// current price (rounded down, so rounding dust stays in the reserve). The
/// position must hold enough of the named asset to cover the release.
/// Deactivated assets can still be redeemed against; deactivation only stops
/// new exposure.
#[allow(clippy::too_many_arguments)]
pub fn burn_against(
    positions: &mut PositionManager,
    ledger: &mut CollateralLedger,
    reserve: &mut ReserveState,
    quotes: &QuoteSet,
    params: &EngineParams,
    owner: &ActorId,
    asset_id: &AssetId,
    amount: StableAmount,
    now: u64,
) -> Result<BurnOutcome> {
    validate_non_zero(amount.micro())?;

    let asset = ledger.registry().require(asset_id)?;
    let ratio_bps = asset.ratio_bps;
    let decimals = asset.decimals;
    let balance = asset.balance;
    let price = quotes.price_of(asset_id)?;

    let position = positions.require(owner)?;
    position.ensure_live()?;

    let burned = amount.min(position.debt);
    if burned.is_zero() {
        return Err(Error::ZeroAmount);
    }

    let release_val = release_value(burned.micro(), ratio_bps)?;
    let released = AssetAmount::from_units(units_for_value(release_val, price, decimals)?);

    let held = position.holding(asset_id);
    if held < released {
        return Err(Error::InsufficientCollateralForBurn {
            required: released.units(),
            available: held.units(),
        });
    }

    // Test the invariant against the post-release reserve before mutating.
    // A high-ratio release shrinks reserve value faster than it shrinks the
    // supply-side requirement, so a burn can be vetoed here.
    let new_balance = AssetAmount::from_units(safe_sub(balance.units(), released.units())?);
    let prospective_value = ledger.reserve_value_with(quotes, asset_id, new_balance)?;
    let new_total = safe_sub(reserve.total_minted().micro(), burned.micro())?;
    check_reserve_invariant(prospective_value, StableAmount::from_micro(new_total), params.required_ratio_bps)?;

    let position = positions.require_live_mut(owner)?;
    position.reduce_debt(burned, now)?;
    if !released.is_zero() {
        position.withdraw(asset_id, released, now)?;
        ledger.record_withdrawal(asset_id, released)?;
    }
    reserve.record_burn(burned)?;

    let new_debt = positions.require(owner)?.debt;

    tracing::info!(
        owner = %owner.short(),
        asset = %asset_id,
        burned = burned.micro(),
        released = released.units(),
        "stablecoin burned"
    );

    Ok(BurnOutcome {
        burned,
        released,
        release_value: release_val,
        new_debt,
    })
}
