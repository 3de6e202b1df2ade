//! Stablecoin token ledger.
//!
//! The engine does not move tokens itself. After its own accounting commits
//! it asks a [`TokenLedger`] to mint or burn, and compensates its books if
//! the ledger refuses. [`StableToken`] is the in-process implementation:
//! a balance map with supply tracking, suitable for tests and single-node
//! deployments.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::actor::ActorId;
use crate::core::amount::StableAmount;
use crate::error::{Error, Result};
use crate::utils::constants::MAX_STAB_SUPPLY;
use crate::utils::digest::Digest;

// ═══════════════════════════════════════════════════════════════════════════════
// TOKEN LEDGER TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Mint and burn surface the engine drives.
///
/// Calls happen after the engine's internal accounting has committed and
/// its state lock has been released. An error from either method makes the
/// engine reverse its bookkeeping and surface the failure, so
/// implementations should reject rather than partially apply.
pub trait TokenLedger: Send + Sync {
    /// Credit freshly issued stablecoin to an actor
    fn mint(&mut self, to: &ActorId, amount: StableAmount) -> Result<()>;

    /// Remove stablecoin from an actor's balance
    fn burn(&mut self, from: &ActorId, amount: StableAmount) -> Result<()>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// STABLE TOKEN
// ═══════════════════════════════════════════════════════════════════════════════

/// In-process rUSD balance ledger
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StableToken {
    total_supply: StableAmount,
    balances: HashMap<ActorId, StableAmount>,
    lifetime_minted: StableAmount,
    lifetime_burned: StableAmount,
}

impl StableToken {
    /// Create an empty token ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Total circulating supply
    pub fn total_supply(&self) -> StableAmount {
        self.total_supply
    }

    /// Balance of an actor
    pub fn balance_of(&self, actor: &ActorId) -> StableAmount {
        self.balances.get(actor).copied().unwrap_or(StableAmount::ZERO)
    }

    /// Number of actors holding a nonzero balance
    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }

    /// Lifetime minted and burned totals
    pub fn lifetime_counters(&self) -> (StableAmount, StableAmount) {
        (self.lifetime_minted, self.lifetime_burned)
    }

    /// Move balance between actors
    pub fn transfer(&mut self, from: &ActorId, to: &ActorId, amount: StableAmount) -> Result<()> {
        if amount.is_zero() {
            return Err(Error::ZeroAmount);
        }
        if from == to {
            return Ok(());
        }

        let from_balance = self.balance_of(from);
        if from_balance < amount {
            return Err(Error::InsufficientCollateral {
                required: amount.micro(),
                available: from_balance.micro(),
            });
        }

        let to_updated = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(Error::Overflow {
                operation: "transfer balance".into(),
            })?;

        let from_updated = from_balance.saturating_sub(amount);
        if from_updated.is_zero() {
            self.balances.remove(from);
        } else {
            self.balances.insert(*from, from_updated);
        }
        self.balances.insert(*to, to_updated);

        Ok(())
    }

    /// Check that the supply equals the sum of all balances
    pub fn verify_supply_invariant(&self) -> bool {
        let sum: u64 = self.balances.values().map(|b| b.micro()).sum();
        sum == self.total_supply.micro()
    }

    /// Deterministic digest of supply and balances
    pub fn state_digest(&self) -> Digest {
        let mut data = Vec::new();
        data.extend_from_slice(&self.total_supply.micro().to_be_bytes());

        let mut sorted: Vec<_> = self.balances.iter().collect();
        sorted.sort_by_key(|(actor, _)| *actor);
        for (actor, balance) in sorted {
            data.extend_from_slice(actor.as_bytes());
            data.extend_from_slice(&balance.micro().to_be_bytes());
        }

        Digest::sha256(&data)
    }
}

impl TokenLedger for StableToken {
    fn mint(&mut self, to: &ActorId, amount: StableAmount) -> Result<()> {
        if amount.is_zero() {
            return Err(Error::ZeroAmount);
        }

        let new_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(Error::Overflow {
                operation: "token supply".into(),
            })?;
        if new_supply.micro() > MAX_STAB_SUPPLY {
            return Err(Error::InvalidParameter {
                name: "amount".into(),
                reason: format!("hard supply cap {} micro-units exceeded", MAX_STAB_SUPPLY),
            });
        }

        let updated = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(Error::Overflow {
                operation: "token balance".into(),
            })?;

        self.balances.insert(*to, updated);
        self.total_supply = new_supply;
        self.lifetime_minted = self.lifetime_minted.saturating_add(amount);

        Ok(())
    }

    fn burn(&mut self, from: &ActorId, amount: StableAmount) -> Result<()> {
        if amount.is_zero() {
            return Err(Error::ZeroAmount);
        }

        let balance = self.balance_of(from);
        if balance < amount {
            return Err(Error::InsufficientCollateral {
                required: amount.micro(),
                available: balance.micro(),
            });
        }

        let updated = balance.saturating_sub(amount);
        if updated.is_zero() {
            self.balances.remove(from);
        } else {
            self.balances.insert(*from, updated);
        }
        self.total_supply = self.total_supply.saturating_sub(amount);
        self.lifetime_burned = self.lifetime_burned.saturating_add(amount);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> ActorId {
        ActorId::derive("alice")
    }

    fn bob() -> ActorId {
        ActorId::derive("bob")
    }

    #[test]
    fn test_mint_credits_balance() {
        let mut token = StableToken::new();
        token.mint(&alice(), StableAmount::from_whole(1_000)).unwrap();

        assert_eq!(token.balance_of(&alice()), StableAmount::from_whole(1_000));
        assert_eq!(token.total_supply(), StableAmount::from_whole(1_000));
    }

    #[test]
    fn test_burn_debits_balance() {
        let mut token = StableToken::new();
        token.mint(&alice(), StableAmount::from_whole(1_000)).unwrap();
        token.burn(&alice(), StableAmount::from_whole(400)).unwrap();

        assert_eq!(token.balance_of(&alice()), StableAmount::from_whole(600));
        assert_eq!(token.total_supply(), StableAmount::from_whole(600));
    }

    #[test]
    fn test_burn_beyond_balance_rejected() {
        let mut token = StableToken::new();
        token.mint(&alice(), StableAmount::from_whole(100)).unwrap();

        let result = token.burn(&alice(), StableAmount::from_whole(200));
        assert!(matches!(result, Err(Error::InsufficientCollateral { .. })));
        assert_eq!(token.balance_of(&alice()), StableAmount::from_whole(100));
    }

    #[test]
    fn test_transfer_moves_balance() {
        let mut token = StableToken::new();
        token.mint(&alice(), StableAmount::from_whole(1_000)).unwrap();
        token
            .transfer(&alice(), &bob(), StableAmount::from_whole(300))
            .unwrap();

        assert_eq!(token.balance_of(&alice()), StableAmount::from_whole(700));
        assert_eq!(token.balance_of(&bob()), StableAmount::from_whole(300));
        assert_eq!(token.total_supply(), StableAmount::from_whole(1_000));
    }

    #[test]
    fn test_supply_invariant_after_churn() {
        let mut token = StableToken::new();
        token.mint(&alice(), StableAmount::from_whole(1_000)).unwrap();
        token.mint(&bob(), StableAmount::from_whole(500)).unwrap();
        token
            .transfer(&alice(), &bob(), StableAmount::from_whole(200))
            .unwrap();
        token.burn(&bob(), StableAmount::from_whole(100)).unwrap();

        assert!(token.verify_supply_invariant());
        let (minted, burned) = token.lifetime_counters();
        assert_eq!(minted, StableAmount::from_whole(1_500));
        assert_eq!(burned, StableAmount::from_whole(100));
    }

    #[test]
    fn test_emptied_holder_is_pruned() {
        let mut token = StableToken::new();
        token.mint(&alice(), StableAmount::from_whole(100)).unwrap();
        token.mint(&bob(), StableAmount::from_whole(100)).unwrap();
        assert_eq!(token.holder_count(), 2);

        token.burn(&alice(), StableAmount::from_whole(100)).unwrap();
        assert_eq!(token.holder_count(), 1);
    }

    #[test]
    fn test_hard_cap_enforced() {
        let mut token = StableToken::new();
        let result = token.mint(&alice(), StableAmount::from_micro(MAX_STAB_SUPPLY + 1));
        assert!(matches!(result, Err(Error::InvalidParameter { .. })));
        assert!(token.total_supply().is_zero());
    }

    #[test]
    fn test_state_digest_deterministic() {
        let mut a = StableToken::new();
        let mut b = StableToken::new();
        a.mint(&alice(), StableAmount::from_whole(100)).unwrap();
        b.mint(&alice(), StableAmount::from_whole(100)).unwrap();

        assert_eq!(a.state_digest(), b.state_digest());

        b.mint(&bob(), StableAmount::from_whole(1)).unwrap();
        assert_ne!(a.state_digest(), b.state_digest());
    }

    #[test]
    fn test_usable_as_trait_object() {
        let mut token = StableToken::new();
        {
            let ledger: &mut dyn TokenLedger = &mut token;
            ledger.mint(&alice(), StableAmount::from_whole(10)).unwrap();
            ledger.burn(&alice(), StableAmount::from_whole(10)).unwrap();
        }
        assert!(token.total_supply().is_zero());
    }
}
