//! Position health evaluation.
//!
//! Health is a pure function of a position, the registry, fresh quotes,
//! and the engine parameters. Nothing here is stored: a position's live
//! status is recomputed on every query so it can never go stale alongside
//! a cached price.

use serde::{Deserialize, Serialize};

use crate::core::actor::ActorId;
use crate::core::amount::StableAmount;
use crate::core::asset::AssetRegistry;
use crate::core::config::EngineParams;
use crate::core::position::Position;
use crate::error::Result;
use crate::oracle::quote::QuoteSet;
use crate::utils::constants::RATIO_UNDEFINED;
use crate::utils::math::{collateral_ratio_bps, max_issuable, safe_add};

// ═══════════════════════════════════════════════════════════════════════════════
// POSITION STATUS
// ═══════════════════════════════════════════════════════════════════════════════

/// Live status of a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionStatus {
    /// Comfortably above the liquidation threshold
    Healthy,
    /// Above the threshold but inside the warning margin
    AtRisk,
    /// At or below the liquidation threshold
    Liquidatable,
}

impl PositionStatus {
    /// Determine status from a collateralization ratio
    pub fn from_ratio(ratio_bps: u64, threshold_bps: u64, margin_bps: u64) -> Self {
        if ratio_bps == RATIO_UNDEFINED {
            return PositionStatus::Healthy;
        }
        if ratio_bps < threshold_bps {
            PositionStatus::Liquidatable
        } else if ratio_bps < threshold_bps.saturating_add(margin_bps) {
            PositionStatus::AtRisk
        } else {
            PositionStatus::Healthy
        }
    }

    /// Check if the position can be liquidated
    pub fn is_liquidatable(&self) -> bool {
        matches!(self, PositionStatus::Liquidatable)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HEALTH REPORT
// ═══════════════════════════════════════════════════════════════════════════════

/// Point-in-time health snapshot of one position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionHealth {
    /// Position owner
    pub owner: ActorId,
    /// Live status at the supplied quotes
    pub status: PositionStatus,
    /// Collateralization ratio in basis points (undefined sentinel for zero debt)
    pub ratio_bps: u64,
    /// Total collateral value in stablecoin micro-units
    pub collateral_value: u64,
    /// Outstanding debt
    pub debt: StableAmount,
    /// Additional stablecoin issuable across all holdings at per-asset ratios
    pub issuance_headroom: StableAmount,
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVALUATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Total value of a position's holdings in stablecoin micro-units
pub fn position_value(
    position: &Position,
    registry: &AssetRegistry,
    quotes: &QuoteSet,
) -> Result<u64> {
    let mut total = 0u64;
    for (asset_id, amount) in &position.holdings {
        let asset = registry.require(asset_id)?;
        let value = asset.value_of(*amount, quotes.price_of(asset_id)?)?;
        total = safe_add(total, value)?;
    }
    Ok(total)
}

/// Collateralization ratio of a position in basis points
pub fn position_ratio_bps(
    position: &Position,
    registry: &AssetRegistry,
    quotes: &QuoteSet,
) -> Result<u64> {
    let value = position_value(position, registry, quotes)?;
    Ok(collateral_ratio_bps(value, position.debt.micro()))
}

/// Maximum debt a position's holdings can support, summing per-asset
/// issuable value at each asset's own required ratio
pub fn issuance_capacity(
    position: &Position,
    registry: &AssetRegistry,
    quotes: &QuoteSet,
) -> Result<u64> {
    let mut capacity = 0u64;
    for (asset_id, amount) in &position.holdings {
        let asset = registry.require(asset_id)?;
        let value = asset.value_of(*amount, quotes.price_of(asset_id)?)?;
        capacity = safe_add(capacity, max_issuable(value, asset.ratio_bps)?)?;
    }
    Ok(capacity)
}

/// Evaluate a position's full health snapshot
pub fn evaluate(
    position: &Position,
    registry: &AssetRegistry,
    quotes: &QuoteSet,
    params: &EngineParams,
) -> Result<PositionHealth> {
    let collateral_value = position_value(position, registry, quotes)?;
    let ratio_bps = collateral_ratio_bps(collateral_value, position.debt.micro());
    let status = PositionStatus::from_ratio(
        ratio_bps,
        params.liquidation_threshold_bps,
        params.at_risk_margin_bps,
    );

    let capacity = issuance_capacity(position, registry, quotes)?;
    let headroom = StableAmount::from_micro(capacity.saturating_sub(position.debt.micro()));

    Ok(PositionHealth {
        owner: position.owner,
        status,
        ratio_bps,
        collateral_value,
        debt: position.debt,
        issuance_headroom: headroom,
    })
}

/// Check whether a position is currently liquidatable
pub fn is_liquidatable(
    position: &Position,
    registry: &AssetRegistry,
    quotes: &QuoteSet,
    params: &EngineParams,
) -> Result<bool> {
    if position.is_terminal() || !position.has_debt() {
        return Ok(false);
    }
    let ratio = position_ratio_bps(position, registry, quotes)?;
    Ok(ratio < params.liquidation_threshold_bps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::amount::AssetAmount;
    use crate::core::asset::{AssetId, CollateralAsset};
    use crate::oracle::quote::PriceQuote;

    fn setup() -> (AssetRegistry, QuoteSet, EngineParams) {
        let mut registry = AssetRegistry::new();
        registry
            .register(CollateralAsset::new(AssetId::new("ABC").unwrap(), 2, 15_000, 0).unwrap())
            .unwrap();
        registry
            .register(CollateralAsset::new(AssetId::new("USDC").unwrap(), 6, 11_000, 0).unwrap())
            .unwrap();

        let mut quotes = QuoteSet::new();
        quotes.insert(PriceQuote::new(AssetId::new("ABC").unwrap(), 1_000_000, 0));
        quotes.insert(PriceQuote::new(AssetId::new("USDC").unwrap(), 1_000_000, 0));

        (registry, quotes, EngineParams::default())
    }

    fn abc() -> AssetId {
        AssetId::new("ABC").unwrap()
    }

    #[test]
    fn test_status_from_ratio() {
        // Threshold 12500, margin 1000
        assert_eq!(
            PositionStatus::from_ratio(15_000, 12_500, 1_000),
            PositionStatus::Healthy
        );
        assert_eq!(
            PositionStatus::from_ratio(13_000, 12_500, 1_000),
            PositionStatus::AtRisk
        );
        assert_eq!(
            PositionStatus::from_ratio(12_499, 12_500, 1_000),
            PositionStatus::Liquidatable
        );
        assert_eq!(
            PositionStatus::from_ratio(RATIO_UNDEFINED, 12_500, 1_000),
            PositionStatus::Healthy
        );
    }

    #[test]
    fn test_position_value_and_ratio() {
        let (registry, quotes, _) = setup();
        let mut position = Position::new(ActorId::derive("alice"), 0);

        // 1000.00 units of 2-decimal asset at price 1.000000
        position.deposit(abc(), AssetAmount::from_units(100_000), 0).unwrap();
        position.add_debt(StableAmount::from_micro(666_666_666), 0).unwrap();

        let value = position_value(&position, &registry, &quotes).unwrap();
        assert_eq!(value, 1_000_000_000);

        let ratio = position_ratio_bps(&position, &registry, &quotes).unwrap();
        assert_eq!(ratio, 15_000);
    }

    #[test]
    fn test_evaluate_headroom() {
        let (registry, quotes, params) = setup();
        let mut position = Position::new(ActorId::derive("alice"), 0);

        position.deposit(abc(), AssetAmount::from_units(100_000), 0).unwrap();

        let health = evaluate(&position, &registry, &quotes, &params).unwrap();
        assert_eq!(health.collateral_value, 1_000_000_000);
        assert_eq!(health.ratio_bps, RATIO_UNDEFINED);
        assert_eq!(health.status, PositionStatus::Healthy);
        // 1000 value at 150% allows 666.666666
        assert_eq!(health.issuance_headroom.micro(), 666_666_666);

        // Existing debt reduces headroom
        let mut indebted = position.clone();
        indebted.add_debt(StableAmount::from_micro(600_000_000), 0).unwrap();
        let health = evaluate(&indebted, &registry, &quotes, &params).unwrap();
        assert_eq!(health.issuance_headroom.micro(), 66_666_666);
    }

    #[test]
    fn test_headroom_uses_per_asset_ratios() {
        let (registry, quotes, params) = setup();
        let mut position = Position::new(ActorId::derive("alice"), 0);

        // 100 USDC at 110% allows 90.909090
        position
            .deposit(AssetId::new("USDC").unwrap(), AssetAmount::from_units(100_000_000), 0)
            .unwrap();

        let health = evaluate(&position, &registry, &quotes, &params).unwrap();
        assert_eq!(health.issuance_headroom.micro(), 90_909_090);
    }

    #[test]
    fn test_is_liquidatable_transitions() {
        let (registry, _, params) = setup();
        let mut position = Position::new(ActorId::derive("alice"), 0);

        position.deposit(abc(), AssetAmount::from_units(100_000), 0).unwrap();
        position.add_debt(StableAmount::from_micro(666_666_666), 0).unwrap();

        // At price 1.00 the ratio is exactly 150%
        let mut quotes = QuoteSet::new();
        quotes.insert(PriceQuote::new(abc(), 1_000_000, 0));
        assert!(!is_liquidatable(&position, &registry, &quotes, &params).unwrap());

        // Price falls 20%: ratio 120%, below the 125% threshold
        let mut quotes = QuoteSet::new();
        quotes.insert(PriceQuote::new(abc(), 800_000, 0));
        assert!(is_liquidatable(&position, &registry, &quotes, &params).unwrap());
    }

    #[test]
    fn test_zero_debt_never_liquidatable() {
        let (registry, quotes, params) = setup();
        let mut position = Position::new(ActorId::derive("alice"), 0);
        position.deposit(abc(), AssetAmount::from_units(1), 0).unwrap();

        assert!(!is_liquidatable(&position, &registry, &quotes, &params).unwrap());
    }
}
