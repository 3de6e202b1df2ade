//! Property tests over the financial arithmetic and the engine's
//! conservation guarantees.

use proptest::prelude::*;

use rusd::liquidation::seizure_amounts;
use rusd::prelude::*;
use rusd::utils::constants::{BPS_DIVISOR, RATIO_UNDEFINED, STAB_BASE_UNIT};
use rusd::utils::math::{
    collateral_ratio_bps, collateral_value, max_issuable, release_value, safe_mul_div,
    value_with_bonus,
};

const T: u64 = 1_700_000_000;

fn root() -> ActorId {
    ActorId::derive("root-admin")
}

fn alice() -> ActorId {
    ActorId::derive("alice")
}

fn gold() -> AssetId {
    AssetId::new("XAUT").unwrap()
}

// ═══════════════════════════════════════════════════════════════════════════════
// ARITHMETIC
// ═══════════════════════════════════════════════════════════════════════════════

proptest! {
    /// The checked mul-div agrees with a wide reference for every input
    /// that fits, and only errors when the true result cannot fit.
    #[test]
    fn mul_div_matches_wide_reference(a in any::<u64>(), b in any::<u64>(), c in 1u64..) {
        let wide = (a as u128) * (b as u128) / (c as u128);
        match safe_mul_div(a, b, c) {
            Ok(out) => prop_assert_eq!(out as u128, wide),
            Err(_) => prop_assert!(wide > u64::MAX as u128),
        }
    }

    /// Issuing at a ratio and then releasing at the same ratio never frees
    /// more value than was locked, whatever the rounding does.
    #[test]
    fn issuance_release_never_inflates(
        value in 0u64..=1 << 50,
        ratio_bps in 10_000u64..=50_000,
    ) {
        let issued = max_issuable(value, ratio_bps)?;
        let released = release_value(issued, ratio_bps)?;
        prop_assert!(released <= value);
        // Floor division can strand at most one micro-unit per conversion
        prop_assert!(value - released <= ratio_bps / BPS_DIVISOR + 1);
    }

    /// More collateral against the same debt never reads as less healthy.
    #[test]
    fn ratio_monotone_in_collateral_value(
        smaller in 0u64..=1 << 50,
        extra in 0u64..=1 << 50,
        debt in 1u64..=1 << 50,
    ) {
        let larger = smaller + extra;
        prop_assert!(
            collateral_ratio_bps(smaller, debt) <= collateral_ratio_bps(larger, debt)
        );
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SEIZURE BOUNDS
// ═══════════════════════════════════════════════════════════════════════════════

proptest! {
    /// A seizure never takes more value than the bonus-grown repayment,
    /// never more than the repayment scaled by the position's own ratio,
    /// and the units handed out never value above the target.
    #[test]
    fn seizure_bounded_by_bonus_and_ratio(
        repay in 1u64..=1_000_000_000_000,
        stablecoin_price in 900_000u64..=1_100_000,
        collateral_price in 100_000u64..=10_000_000_000,
        decimals in 0u8..=8,
        bonus_bps in 0u64..=2_000,
        ratio_bps in 0u64..=20_000,
    ) {
        let (units, seize_value) = seizure_amounts(
            repay,
            stablecoin_price,
            collateral_price,
            decimals,
            bonus_bps,
            ratio_bps,
        )?;

        let repay_value = safe_mul_div(repay, stablecoin_price, STAB_BASE_UNIT)?;
        prop_assert!(seize_value <= value_with_bonus(repay_value, bonus_bps)?);
        prop_assert!(seize_value <= safe_mul_div(repay_value, ratio_bps, BPS_DIVISOR)?);
        prop_assert!(collateral_value(units, collateral_price, decimals)? <= seize_value);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENGINE CONSERVATION
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
enum Action {
    Deposit(u64),
    Mint(u64),
    Burn(u64),
    Withdraw(u64),
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        (1u64..=50_000).prop_map(Action::Deposit),
        (1u64..=50_000).prop_map(Action::Mint),
        (1u64..=200_000_000).prop_map(Action::Burn),
        (1u64..=50_000).prop_map(Action::Withdraw),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Whatever sequence of deposits, issuances, redemptions and
    /// withdrawals a user throws at the engine, and however many of them
    /// get refused, the books stay balanced: per-asset balances match
    /// position holdings, debt matches token supply, and the reserve
    /// never dips under the required floor.
    #[test]
    fn books_balance_under_any_action_sequence(
        actions in prop::collection::vec(action_strategy(), 1..24),
    ) {
        let oracle = StaticOracle::with_peg(T);
        oracle.set_price(gold(), 1_000_000, T);
        let engine = ReserveEngine::new(oracle, StableToken::new(), root());
        engine.add_collateral_asset(root(), gold(), 2, 15_000, T).unwrap();

        for (step, action) in actions.iter().enumerate() {
            let now = T + 10 + step as u64;
            // Refusals are expected along the way; corruption is not
            let _ = match action {
                Action::Deposit(units) => engine
                    .deposit(alice(), &gold(), AssetAmount::from_units(*units), now)
                    .map(|_| ()),
                Action::Mint(units) => engine
                    .mint(alice(), &gold(), AssetAmount::from_units(*units), now)
                    .map(|_| ()),
                Action::Burn(micro) => engine
                    .burn(alice(), &gold(), StableAmount::from_micro(*micro), now)
                    .map(|_| ()),
                Action::Withdraw(units) => engine
                    .withdraw(alice(), &gold(), AssetAmount::from_units(*units), now)
                    .map(|_| ()),
            };

            prop_assert!(engine.verify_books().unwrap());
            let minted = engine.total_minted().unwrap();
            let supply = engine.with_token(|t| t.total_supply()).unwrap();
            prop_assert_eq!(minted.micro(), supply.micro());
        }

        let report = engine.reserve_report(T + 100).unwrap();
        prop_assert!(
            report.reserve_ratio_bps >= 15_000
                || report.reserve_ratio_bps == RATIO_UNDEFINED
        );
        prop_assert!(engine.verify_audit_chain().unwrap());
    }
}
