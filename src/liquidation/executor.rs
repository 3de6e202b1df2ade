//! Liquidation of undercollateralized positions.
//!
//! A liquidator repays part of a position's debt and receives collateral of
//! a named asset worth the repayment plus a bonus. The seizure is computed
//! in value space first, then converted to asset units at the current quote,
//! so the same bonus applies uniformly across assets with different decimals.

use serde::{Deserialize, Serialize};

use crate::core::actor::ActorId;
use crate::core::amount::{AssetAmount, StableAmount};
use crate::core::asset::AssetId;
use crate::core::config::EngineParams;
use crate::core::position::PositionManager;
use crate::error::{Error, Result};
use crate::health;
use crate::ledger::{CollateralLedger, ReserveState};
use crate::oracle::quote::QuoteSet;
use crate::utils::constants::{BPS_DIVISOR, RATIO_UNDEFINED, STAB_BASE_UNIT};
use crate::utils::math::{collateral_value, safe_mul_div, units_for_value, value_with_bonus};
use crate::utils::validation::validate_non_zero;

// ═══════════════════════════════════════════════════════════════════════════════
// OUTCOME
// ═══════════════════════════════════════════════════════════════════════════════

/// Record of an executed liquidation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidationOutcome {
    /// Owner of the liquidated position
    pub owner: ActorId,
    /// Actor who repaid the debt
    pub liquidator: ActorId,
    /// Debt retired, after clamping to the outstanding amount
    pub repaid: StableAmount,
    /// Asset the seizure was taken from
    pub asset: AssetId,
    /// Collateral units handed to the liquidator
    pub seized: AssetAmount,
    /// Value of the seized collateral at the liquidation price
    pub seized_value: u64,
    /// Position ratio when the liquidation was admitted
    pub ratio_before_bps: u64,
    /// Position ratio after the seizure
    pub ratio_after_bps: u64,
    /// Collateral asset price used
    pub collateral_price: u64,
    /// Stablecoin price used
    pub stablecoin_price: u64,
    /// Whether the position ended fully stripped and was retired
    pub wound_down: bool,
    /// Unix timestamp of execution
    pub timestamp: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// SEIZURE MATH
// ═══════════════════════════════════════════════════════════════════════════════

/// Compute the collateral seizure for a repayment.
///
/// The repayment is valued at the stablecoin's own quote, grown by the
/// liquidation bonus, and converted to asset units at the collateral quote
/// (rounded down). The bonus-adjusted value is additionally capped at
/// `repay_value * position_ratio / 10000`: for an underwater position the
/// full bonus would strip value faster than debt and push the ratio further
/// down, so the cap shrinks the bonus until the ratio can only improve.
///
/// Returns the seizure in asset base units together with the value it was
/// derived from.
pub fn seizure_amounts(
    repay_micro: u64,
    stablecoin_price: u64,
    collateral_price: u64,
    decimals: u8,
    bonus_bps: u64,
    position_ratio_bps: u64,
) -> Result<(u64, u64)> {
    let repay_value = safe_mul_div(repay_micro, stablecoin_price, STAB_BASE_UNIT)?;
    let with_bonus = value_with_bonus(repay_value, bonus_bps)?;

    let seize_value = if position_ratio_bps == RATIO_UNDEFINED {
        with_bonus
    } else {
        with_bonus.min(safe_mul_div(repay_value, position_ratio_bps, BPS_DIVISOR)?)
    };

    let units = units_for_value(seize_value, collateral_price, decimals)?;
    Ok((units, seize_value))
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXECUTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Liquidate a position by repaying up to `repay` of its debt.
///
/// The position must price below the liquidation threshold using the
/// supplied quotes. The repayment is clamped to the outstanding debt and the
/// seizure to the position's holding of the named asset; debt reduction and
/// collateral seizure land in the same call or not at all. A position left
/// with no debt and no holdings is retired.
///
/// Owners cannot liquidate themselves.
#[allow(clippy::too_many_arguments)]
pub fn liquidate(
    positions: &mut PositionManager,
    ledger: &mut CollateralLedger,
    reserve: &mut ReserveState,
    quotes: &QuoteSet,
    params: &EngineParams,
    liquidator: &ActorId,
    owner: &ActorId,
    asset_id: &AssetId,
    repay: StableAmount,
    now: u64,
) -> Result<LiquidationOutcome> {
    if liquidator == owner {
        return Err(Error::SelfLiquidationForbidden);
    }
    validate_non_zero(repay.micro())?;

    let asset = ledger.registry().require(asset_id)?;
    let decimals = asset.decimals;
    let collateral_price = quotes.price_of(asset_id)?;
    let stablecoin_price = quotes.price_of(&AssetId::stablecoin())?;

    let position = positions.require(owner)?;
    position.ensure_live()?;

    let ratio_before_bps = health::position_ratio_bps(position, ledger.registry(), quotes)?;
    if ratio_before_bps >= params.liquidation_threshold_bps {
        return Err(Error::NotLiquidatable {
            ratio_bps: ratio_before_bps,
            threshold_bps: params.liquidation_threshold_bps,
        });
    }

    let repaid = repay.min(position.debt);
    let (units, _) = seizure_amounts(
        repaid.micro(),
        stablecoin_price,
        collateral_price,
        decimals,
        params.liquidation_bonus_bps,
        ratio_before_bps,
    )?;
    let target = AssetAmount::from_units(units).min(position.holding(asset_id));

    let position = positions.require_live_mut(owner)?;
    position.reduce_debt(repaid, now)?;
    let seized = position.seize(asset_id, target, now)?;
    if !seized.is_zero() {
        ledger.record_withdrawal(asset_id, seized)?;
    }
    reserve.record_burn(repaid)?;

    let position = positions.require(owner)?;
    let ratio_after_bps = health::position_ratio_bps(position, ledger.registry(), quotes)?;
    let wound_down = !position.has_debt() && !position.has_holdings();
    if wound_down {
        positions.mark_liquidated(owner, now)?;
    }

    let seized_value = collateral_value(seized.units(), collateral_price, decimals)?;

    tracing::info!(
        owner = %owner.short(),
        liquidator = %liquidator.short(),
        asset = %asset_id,
        repaid = repaid.micro(),
        seized = seized.units(),
        ratio_before_bps,
        ratio_after_bps,
        "position liquidated"
    );

    Ok(LiquidationOutcome {
        owner: *owner,
        liquidator: *liquidator,
        repaid,
        asset: asset_id.clone(),
        seized,
        seized_value,
        ratio_before_bps,
        ratio_after_bps,
        collateral_price,
        stablecoin_price,
        wound_down,
        timestamp: now,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// DETECTION
// ═══════════════════════════════════════════════════════════════════════════════

/// Find every live position priced below the liquidation threshold.
///
/// Returns owners with their current ratios, lowest ratio first, so callers
/// work through the worst positions before the merely distressed ones.
/// Positions whose collateral cannot be priced are skipped, never guessed
/// at.
pub fn scan_liquidatable(
    positions: &PositionManager,
    ledger: &CollateralLedger,
    quotes: &QuoteSet,
    params: &EngineParams,
) -> Result<Vec<(ActorId, u64)>> {
    let mut found = Vec::new();
    for position in positions.live() {
        if !position.has_debt() {
            continue;
        }
        let ratio = match health::position_ratio_bps(position, ledger.registry(), quotes) {
            Ok(ratio) => ratio,
            Err(Error::PriceUnavailable { asset }) => {
                tracing::warn!(
                    owner = %position.owner.short(),
                    asset = %asset,
                    "skipping unpriceable position in liquidation scan"
                );
                continue;
            }
            Err(e) => return Err(e),
        };
        if ratio < params.liquidation_threshold_bps {
            found.push((position.owner, ratio));
        }
    }
    found.sort_by_key(|(_, ratio)| *ratio);
    Ok(found)
}
