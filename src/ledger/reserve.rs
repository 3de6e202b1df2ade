//! Supply accounting and the reserve invariant.
//!
//! `ReserveState` tracks how much stablecoin the engine has issued. The
//! invariant check compares that supply against the current reserve value;
//! it is evaluated on prospective state before any operation commits, so a
//! violation means the operation is refused, not unwound.

use serde::{Deserialize, Serialize};

use crate::core::amount::StableAmount;
use crate::error::{Error, Result};
use crate::utils::constants::BPS_DIVISOR;
use crate::utils::math::collateral_ratio_bps;

// ═══════════════════════════════════════════════════════════════════════════════
// RESERVE STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Issued-supply counters
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ReserveState {
    /// Stablecoin currently in circulation
    total_minted: StableAmount,
    /// Lifetime stablecoin minted
    lifetime_minted: StableAmount,
    /// Lifetime stablecoin burned
    lifetime_burned: StableAmount,
}

impl ReserveState {
    /// Create a zeroed state
    pub fn new() -> Self {
        Self::default()
    }

    /// Stablecoin currently in circulation
    pub fn total_minted(&self) -> StableAmount {
        self.total_minted
    }

    /// Lifetime mint and burn counters
    pub fn lifetime_counters(&self) -> (StableAmount, StableAmount) {
        (self.lifetime_minted, self.lifetime_burned)
    }

    /// Book newly issued supply
    pub fn record_mint(&mut self, amount: StableAmount, ceiling_micro: u64) -> Result<()> {
        let updated = self.total_minted.checked_add(amount).ok_or(Error::Overflow {
            operation: "total minted".into(),
        })?;

        if updated.micro() > ceiling_micro {
            return Err(Error::InvalidParameter {
                name: "amount".into(),
                reason: format!(
                    "supply ceiling {} micro-units would be exceeded",
                    ceiling_micro
                ),
            });
        }

        let lifetime = self
            .lifetime_minted
            .checked_add(amount)
            .ok_or(Error::Overflow {
                operation: "lifetime minted".into(),
            })?;

        self.total_minted = updated;
        self.lifetime_minted = lifetime;
        Ok(())
    }

    /// Book retired supply
    pub fn record_burn(&mut self, amount: StableAmount) -> Result<()> {
        let updated = self.total_minted.checked_sub(amount).ok_or(Error::Underflow {
            operation: "total minted".into(),
        })?;
        let lifetime = self
            .lifetime_burned
            .checked_add(amount)
            .ok_or(Error::Overflow {
                operation: "lifetime burned".into(),
            })?;

        self.total_minted = updated;
        self.lifetime_burned = lifetime;
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RESERVE INVARIANT
// ═══════════════════════════════════════════════════════════════════════════════

/// Check that the reserve can back the supply at the required ratio.
///
/// Holds when `reserve_value * 10000 >= total_minted * required_ratio_bps`,
/// compared in 128-bit space so neither side can overflow.
pub fn check_reserve_invariant(
    reserve_value_micro: u64,
    total_minted: StableAmount,
    required_ratio_bps: u64,
) -> Result<()> {
    let lhs = reserve_value_micro as u128 * BPS_DIVISOR as u128;
    let rhs = total_minted.micro() as u128 * required_ratio_bps as u128;

    if lhs < rhs {
        return Err(Error::InvariantViolation(format!(
            "reserve value {} cannot back supply {} at {} bps",
            reserve_value_micro,
            total_minted.micro(),
            required_ratio_bps
        )));
    }

    Ok(())
}

/// Current system-wide backing ratio in basis points.
///
/// Returns the undefined sentinel when nothing is in circulation.
pub fn reserve_ratio_bps(reserve_value_micro: u64, total_minted: StableAmount) -> u64 {
    collateral_ratio_bps(reserve_value_micro, total_minted.micro())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::constants::{MAX_STAB_SUPPLY, RATIO_UNDEFINED};

    #[test]
    fn test_mint_burn_counters() {
        let mut state = ReserveState::new();

        state
            .record_mint(StableAmount::from_micro(1_000_000), MAX_STAB_SUPPLY)
            .unwrap();
        state
            .record_mint(StableAmount::from_micro(500_000), MAX_STAB_SUPPLY)
            .unwrap();
        state.record_burn(StableAmount::from_micro(300_000)).unwrap();

        assert_eq!(state.total_minted().micro(), 1_200_000);
        let (minted, burned) = state.lifetime_counters();
        assert_eq!(minted.micro(), 1_500_000);
        assert_eq!(burned.micro(), 300_000);
    }

    #[test]
    fn test_supply_ceiling_enforced() {
        let mut state = ReserveState::new();
        state
            .record_mint(StableAmount::from_micro(900), 1_000)
            .unwrap();

        let result = state.record_mint(StableAmount::from_micro(101), 1_000);
        assert!(result.is_err());
        assert_eq!(state.total_minted().micro(), 900);

        state.record_mint(StableAmount::from_micro(100), 1_000).unwrap();
        assert_eq!(state.total_minted().micro(), 1_000);
    }

    #[test]
    fn test_burn_beyond_supply_fails() {
        let mut state = ReserveState::new();
        state
            .record_mint(StableAmount::from_micro(100), MAX_STAB_SUPPLY)
            .unwrap();

        let result = state.record_burn(StableAmount::from_micro(101));
        assert!(matches!(result, Err(Error::Underflow { .. })));
    }

    #[test]
    fn test_invariant_boundary() {
        // 150 value backing 100 supply at 150% holds exactly
        let supply = StableAmount::from_micro(100_000_000);
        assert!(check_reserve_invariant(150_000_000, supply, 15_000).is_ok());
        assert!(check_reserve_invariant(149_999_999, supply, 15_000).is_err());
    }

    #[test]
    fn test_invariant_zero_supply_always_holds() {
        assert!(check_reserve_invariant(0, StableAmount::ZERO, 15_000).is_ok());
        assert!(check_reserve_invariant(123, StableAmount::ZERO, 15_000).is_ok());
    }

    #[test]
    fn test_reserve_ratio() {
        let supply = StableAmount::from_micro(1_000_000);
        assert_eq!(reserve_ratio_bps(1_500_000, supply), 15_000);
        assert_eq!(reserve_ratio_bps(0, StableAmount::ZERO), RATIO_UNDEFINED);
    }
}
