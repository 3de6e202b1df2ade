//! Reserve positions and the position manager.
//!
//! A position tracks one actor's collateral holdings and outstanding
//! stablecoin debt. Position mutations are pure accounting; valuation and
//! ratio checks live in the health and issuance modules because they need
//! the full quote set.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::actor::ActorId;
use crate::core::amount::{AssetAmount, StableAmount};
use crate::core::asset::AssetId;
use crate::error::{Error, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// TERMINAL STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// Why a position stopped being live.
///
/// Live health (healthy, at risk, liquidatable) is never stored; it is
/// recomputed from fresh prices on every query. Only the terminal outcome
/// is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminalState {
    /// Owner repaid all debt and withdrew all collateral
    Closed,
    /// Debt and collateral were wound down through liquidation
    Liquidated,
}

// ═══════════════════════════════════════════════════════════════════════════════
// POSITION
// ═══════════════════════════════════════════════════════════════════════════════

/// One actor's collateral holdings and stablecoin debt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// Owning actor
    pub owner: ActorId,
    /// Outstanding stablecoin debt
    pub debt: StableAmount,
    /// Collateral holdings by asset
    pub holdings: HashMap<AssetId, AssetAmount>,
    /// Terminal outcome, if the position has ended
    pub terminal: Option<TerminalState>,
    /// Unix timestamp of creation
    pub created_at: u64,
    /// Unix timestamp of last mutation
    pub last_updated: u64,
}

impl Position {
    /// Create a new empty position
    pub fn new(owner: ActorId, now: u64) -> Self {
        Self {
            owner,
            debt: StableAmount::ZERO,
            holdings: HashMap::new(),
            terminal: None,
            created_at: now,
            last_updated: now,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Units of one asset held by this position
    pub fn holding(&self, asset: &AssetId) -> AssetAmount {
        self.holdings.get(asset).copied().unwrap_or(AssetAmount::ZERO)
    }

    /// Whether the position owes any stablecoin
    pub fn has_debt(&self) -> bool {
        !self.debt.is_zero()
    }

    /// Whether the position holds any collateral
    pub fn has_holdings(&self) -> bool {
        self.holdings.values().any(|a| !a.is_zero())
    }

    /// Whether the position has ended
    pub fn is_terminal(&self) -> bool {
        self.terminal.is_some()
    }

    /// Fail with `PositionClosed` if the position has ended
    pub fn ensure_live(&self) -> Result<()> {
        if self.is_terminal() {
            return Err(Error::PositionClosed(self.owner.short()));
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // MUTATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Add collateral units to a holding
    pub fn deposit(&mut self, asset: AssetId, amount: AssetAmount, now: u64) -> Result<()> {
        self.ensure_live()?;
        if amount.is_zero() {
            return Err(Error::ZeroAmount);
        }

        let current = self.holding(&asset);
        let updated = current.checked_add(amount).ok_or(Error::Overflow {
            operation: "position deposit".into(),
        })?;

        self.holdings.insert(asset, updated);
        self.last_updated = now;
        Ok(())
    }

    /// Remove collateral units from a holding
    pub fn withdraw(&mut self, asset: &AssetId, amount: AssetAmount, now: u64) -> Result<()> {
        self.ensure_live()?;
        if amount.is_zero() {
            return Err(Error::ZeroAmount);
        }

        let current = self.holding(asset);
        if amount > current {
            return Err(Error::InsufficientCollateral {
                required: amount.units(),
                available: current.units(),
            });
        }

        let remaining = current.saturating_sub(amount);
        if remaining.is_zero() {
            self.holdings.remove(asset);
        } else {
            self.holdings.insert(asset.clone(), remaining);
        }
        self.last_updated = now;
        Ok(())
    }

    /// Seize up to `amount` units of a holding, returning what was taken
    pub fn seize(&mut self, asset: &AssetId, amount: AssetAmount, now: u64) -> Result<AssetAmount> {
        self.ensure_live()?;

        let current = self.holding(asset);
        let seized = amount.min(current);

        let remaining = current.saturating_sub(seized);
        if remaining.is_zero() {
            self.holdings.remove(asset);
        } else {
            self.holdings.insert(asset.clone(), remaining);
        }
        self.last_updated = now;
        Ok(seized)
    }

    /// Increase debt
    pub fn add_debt(&mut self, amount: StableAmount, now: u64) -> Result<()> {
        self.ensure_live()?;

        self.debt = self.debt.checked_add(amount).ok_or(Error::Overflow {
            operation: "position debt".into(),
        })?;
        self.last_updated = now;
        Ok(())
    }

    /// Decrease debt, returning the amount actually repaid.
    ///
    /// Overpayment is truncated to the outstanding debt.
    pub fn reduce_debt(&mut self, amount: StableAmount, now: u64) -> Result<StableAmount> {
        self.ensure_live()?;

        let repaid = amount.min(self.debt);
        self.debt = self.debt.saturating_sub(repaid);
        self.last_updated = now;
        Ok(repaid)
    }

    /// Close the position, returning all holdings to the owner.
    ///
    /// All debt must be repaid first.
    pub fn close(&mut self, now: u64) -> Result<Vec<(AssetId, AssetAmount)>> {
        self.ensure_live()?;

        if self.has_debt() {
            return Err(Error::InvalidParameter {
                name: "debt".into(),
                reason: "all debt must be repaid before closing".into(),
            });
        }

        let returned: Vec<_> = self.holdings.drain().collect();
        self.terminal = Some(TerminalState::Closed);
        self.last_updated = now;
        Ok(returned)
    }

    /// Mark the position as liquidated.
    ///
    /// Only valid once liquidation has wound the position down to zero
    /// debt and zero holdings.
    pub fn mark_liquidated(&mut self, now: u64) -> Result<()> {
        self.ensure_live()?;

        if self.has_debt() || self.has_holdings() {
            return Err(Error::Internal(
                "position still carries debt or holdings".into(),
            ));
        }

        self.terminal = Some(TerminalState::Liquidated);
        self.last_updated = now;
        Ok(())
    }

    /// Reset a terminal position so the owner can use it again
    pub fn reopen(&mut self, now: u64) {
        self.terminal = None;
        self.created_at = now;
        self.last_updated = now;
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// POSITION MANAGER
// ═══════════════════════════════════════════════════════════════════════════════

/// All positions, one per actor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PositionManager {
    positions: HashMap<ActorId, Position>,
    opened_count: u64,
    closed_count: u64,
    liquidated_count: u64,
}

impl PositionManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the position for an actor, creating one if absent.
    ///
    /// A terminal position is reopened rather than replaced, so the
    /// actor's history stays under one entry.
    pub fn open_or_get(&mut self, actor: ActorId, now: u64) -> &mut Position {
        let is_new = !self.positions.contains_key(&actor);
        let position = self
            .positions
            .entry(actor)
            .or_insert_with(|| Position::new(actor, now));

        if is_new {
            self.opened_count += 1;
        } else if position.is_terminal() {
            position.reopen(now);
            self.opened_count += 1;
        }

        position
    }

    /// Get a position by actor
    pub fn get(&self, actor: &ActorId) -> Option<&Position> {
        self.positions.get(actor)
    }

    /// Get a mutable position by actor
    pub fn get_mut(&mut self, actor: &ActorId) -> Option<&mut Position> {
        self.positions.get_mut(actor)
    }

    /// Get a position, failing if absent
    pub fn require(&self, actor: &ActorId) -> Result<&Position> {
        self.positions
            .get(actor)
            .ok_or_else(|| Error::PositionNotFound(actor.short()))
    }

    /// Get a mutable position, failing if absent
    pub fn require_mut(&mut self, actor: &ActorId) -> Result<&mut Position> {
        self.positions
            .get_mut(actor)
            .ok_or_else(|| Error::PositionNotFound(actor.short()))
    }

    /// Get a live position, failing if absent or terminal
    pub fn require_live_mut(&mut self, actor: &ActorId) -> Result<&mut Position> {
        let position = self.require_mut(actor)?;
        position.ensure_live()?;
        Ok(position)
    }

    /// Close an actor's position, returning the holdings to release
    pub fn close(&mut self, actor: &ActorId, now: u64) -> Result<Vec<(AssetId, AssetAmount)>> {
        let position = self.require_mut(actor)?;
        let returned = position.close(now)?;
        self.closed_count += 1;
        tracing::info!(actor = %actor.short(), assets = returned.len(), "position closed");
        Ok(returned)
    }

    /// Mark an actor's position as fully liquidated
    pub fn mark_liquidated(&mut self, actor: &ActorId, now: u64) -> Result<()> {
        let position = self.require_mut(actor)?;
        position.mark_liquidated(now)?;
        self.liquidated_count += 1;
        Ok(())
    }

    /// Reinstate a previously captured snapshot of a position.
    ///
    /// Used to compensate a committed operation after the external token
    /// ledger rejects its side. Any terminal transition made since the
    /// capture is reversed, counters included.
    pub fn restore(&mut self, snapshot: Position) -> Result<()> {
        let owner = snapshot.owner;
        let became_terminal = self
            .require(&owner)?
            .terminal
            .filter(|_| !snapshot.is_terminal());

        match became_terminal {
            Some(TerminalState::Closed) => {
                self.closed_count = self.closed_count.saturating_sub(1);
            }
            Some(TerminalState::Liquidated) => {
                self.liquidated_count = self.liquidated_count.saturating_sub(1);
            }
            None => {}
        }

        self.positions.insert(owner, snapshot);
        Ok(())
    }

    /// Iterate over all positions
    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    /// Iterate over live positions only
    pub fn live(&self) -> impl Iterator<Item = &Position> {
        self.positions.values().filter(|p| !p.is_terminal())
    }

    /// Sum of debt across all positions
    pub fn total_debt(&self) -> StableAmount {
        self.positions
            .values()
            .fold(StableAmount::ZERO, |acc, p| acc.saturating_add(p.debt))
    }

    /// Number of actors with a position entry
    pub fn total_count(&self) -> usize {
        self.positions.len()
    }

    /// Lifetime number of opens, counting reopens
    pub fn opened_count(&self) -> u64 {
        self.opened_count
    }

    /// Number of live positions
    pub fn live_count(&self) -> usize {
        self.positions.values().filter(|p| !p.is_terminal()).count()
    }

    /// Lifetime closed and liquidated counters
    pub fn terminal_counts(&self) -> (u64, u64) {
        (self.closed_count, self.liquidated_count)
    }
}
