//! Stablecoin issuance and redemption.
//!
//! The controller owns the mint and burn computations. Callers supply the
//! pre-validated quotes and the ledgers to mutate; the engine wraps these
//! in its lock and handles the token-side effects.

pub mod controller;

pub use controller::{burn_against, mint_against, BurnOutcome, MintOutcome};
