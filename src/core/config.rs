//! Engine configuration and tunable parameters.
//!
//! Parameters carry per-field bounds plus cross-field consistency rules,
//! checked on every change. The required ratio here is the global reserve
//! invariant ratio; per-asset issuance ratios live in the asset registry.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::utils::constants::*;

// ═══════════════════════════════════════════════════════════════════════════════
// ENGINE PARAMETERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Parameters that can be changed at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineParameter {
    /// Global required reserve ratio (basis points)
    RequiredRatio,
    /// Ratio below which a position becomes liquidatable (basis points)
    LiquidationThreshold,
    /// Bonus collateral granted to liquidators (basis points)
    LiquidationBonus,
    /// Maximum quote age accepted by the engine (seconds)
    PriceStaleness,
    /// Margin above the liquidation threshold reported as at risk (basis points)
    AtRiskMargin,
    /// Maximum total stablecoin supply (micro-units)
    SupplyCeiling,
}

impl EngineParameter {
    /// Get human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::RequiredRatio => "Required Ratio",
            Self::LiquidationThreshold => "Liquidation Threshold",
            Self::LiquidationBonus => "Liquidation Bonus",
            Self::PriceStaleness => "Price Staleness",
            Self::AtRiskMargin => "At Risk Margin",
            Self::SupplyCeiling => "Supply Ceiling",
        }
    }

    /// Get validation bounds (min, max)
    pub fn bounds(&self) -> (u64, u64) {
        match self {
            Self::RequiredRatio => (RATIO_FLOOR_BPS, MAX_RATIO_BPS),
            Self::LiquidationThreshold => (RATIO_FLOOR_BPS, MAX_RATIO_BPS),
            Self::LiquidationBonus => (0, MAX_LIQUIDATION_BONUS_BPS),
            Self::PriceStaleness => (MIN_PRICE_STALENESS_SECS, MAX_PRICE_STALENESS_SECS),
            Self::AtRiskMargin => (0, BPS_DIVISOR),
            Self::SupplyCeiling => (0, MAX_STAB_SUPPLY),
        }
    }

    /// Validate a value for this parameter
    pub fn validate(&self, value: u64) -> Result<()> {
        let (min, max) = self.bounds();

        if value < min || value > max {
            return Err(Error::InvalidParameter {
                name: self.name().into(),
                reason: format!("value {} outside bounds [{}, {}]", value, min, max),
            });
        }

        Ok(())
    }
}

/// The full tunable parameter set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineParams {
    /// Global required reserve ratio in basis points
    pub required_ratio_bps: u64,
    /// Liquidation threshold in basis points
    pub liquidation_threshold_bps: u64,
    /// Liquidation bonus in basis points
    pub liquidation_bonus_bps: u64,
    /// Maximum accepted quote age in seconds
    pub price_staleness_secs: u64,
    /// At-risk margin above the liquidation threshold in basis points
    pub at_risk_margin_bps: u64,
    /// Maximum total supply in micro-units
    pub supply_ceiling_micro: u64,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            required_ratio_bps: DEFAULT_REQUIRED_RATIO_BPS,
            liquidation_threshold_bps: DEFAULT_LIQUIDATION_THRESHOLD_BPS,
            liquidation_bonus_bps: DEFAULT_LIQUIDATION_BONUS_BPS,
            price_staleness_secs: DEFAULT_PRICE_STALENESS_SECS,
            at_risk_margin_bps: DEFAULT_AT_RISK_MARGIN_BPS,
            supply_ceiling_micro: MAX_STAB_SUPPLY,
        }
    }
}

impl EngineParams {
    /// Create with custom ratios (for testing)
    pub fn with_ratios(mut self, required_bps: u64, threshold_bps: u64) -> Self {
        self.required_ratio_bps = required_bps;
        self.liquidation_threshold_bps = threshold_bps;
        self
    }

    /// Create with a custom liquidation bonus (for testing)
    pub fn with_bonus(mut self, bonus_bps: u64) -> Self {
        self.liquidation_bonus_bps = bonus_bps;
        self
    }

    /// Read one parameter's current value
    pub fn get(&self, parameter: EngineParameter) -> u64 {
        match parameter {
            EngineParameter::RequiredRatio => self.required_ratio_bps,
            EngineParameter::LiquidationThreshold => self.liquidation_threshold_bps,
            EngineParameter::LiquidationBonus => self.liquidation_bonus_bps,
            EngineParameter::PriceStaleness => self.price_staleness_secs,
            EngineParameter::AtRiskMargin => self.at_risk_margin_bps,
            EngineParameter::SupplyCeiling => self.supply_ceiling_micro,
        }
    }

    /// Set one parameter, returning the previous value.
    ///
    /// The new value must satisfy both its own bounds and the cross-field
    /// rules; on failure nothing changes.
    pub fn set(&mut self, parameter: EngineParameter, value: u64) -> Result<u64> {
        parameter.validate(value)?;

        let mut updated = *self;
        let previous = match parameter {
            EngineParameter::RequiredRatio => {
                std::mem::replace(&mut updated.required_ratio_bps, value)
            }
            EngineParameter::LiquidationThreshold => {
                std::mem::replace(&mut updated.liquidation_threshold_bps, value)
            }
            EngineParameter::LiquidationBonus => {
                std::mem::replace(&mut updated.liquidation_bonus_bps, value)
            }
            EngineParameter::PriceStaleness => {
                std::mem::replace(&mut updated.price_staleness_secs, value)
            }
            EngineParameter::AtRiskMargin => {
                std::mem::replace(&mut updated.at_risk_margin_bps, value)
            }
            EngineParameter::SupplyCeiling => {
                std::mem::replace(&mut updated.supply_ceiling_micro, value)
            }
        };

        updated.validate()?;
        *self = updated;
        Ok(previous)
    }

    /// Validate the parameter set as a whole
    pub fn validate(&self) -> Result<()> {
        for parameter in [
            EngineParameter::RequiredRatio,
            EngineParameter::LiquidationThreshold,
            EngineParameter::LiquidationBonus,
            EngineParameter::PriceStaleness,
            EngineParameter::AtRiskMargin,
            EngineParameter::SupplyCeiling,
        ] {
            parameter.validate(self.get(parameter))?;
        }

        // A threshold above the required ratio would make freshly issued
        // positions instantly liquidatable
        if self.liquidation_threshold_bps > self.required_ratio_bps {
            return Err(Error::InvalidParameter {
                name: "Liquidation Threshold".into(),
                reason: format!(
                    "threshold {} exceeds required ratio {}",
                    self.liquidation_threshold_bps, self.required_ratio_bps
                ),
            });
        }

        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENGINE CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Runtime configuration: the parameter set plus the pause switch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Tunable parameters
    pub params: EngineParams,
    /// Whether state-changing operations are suspended
    pub paused: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            params: EngineParams::default(),
            paused: false,
        }
    }
}

impl EngineConfig {
    /// Create a configuration from a validated parameter set
    pub fn new(params: EngineParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            paused: false,
        })
    }

    /// Fail with `EnginePaused` if the engine is paused
    pub fn ensure_active(&self) -> Result<()> {
        if self.paused {
            return Err(Error::EnginePaused);
        }
        Ok(())
    }

    /// Suspend state-changing operations
    pub fn pause(&mut self) -> Result<()> {
        if self.paused {
            return Err(Error::InvalidParameter {
                name: "paused".into(),
                reason: "engine is already paused".into(),
            });
        }
        self.paused = true;
        tracing::warn!("engine paused");
        Ok(())
    }

    /// Resume state-changing operations
    pub fn resume(&mut self) -> Result<()> {
        if !self.paused {
            return Err(Error::InvalidParameter {
                name: "paused".into(),
                reason: "engine is not paused".into(),
            });
        }
        self.paused = false;
        tracing::info!("engine resumed");
        Ok(())
    }

    /// Set one parameter, returning the previous value
    pub fn set_parameter(&mut self, parameter: EngineParameter, value: u64) -> Result<u64> {
        let previous = self.params.set(parameter, value)?;
        tracing::info!(
            parameter = parameter.name(),
            previous,
            value,
            "parameter changed"
        );
        Ok(previous)
    }
}
