//! Utility modules for the rUSD engine.
//!
//! This module contains shared utilities used across the engine:
//! - Checked arithmetic and ratio math
//! - Validation helpers
//! - SHA-256 digests for record chains and state hashes
//! - Constants

pub mod constants;
pub mod digest;
pub mod math;
pub mod validation;

pub use constants::*;
pub use digest::Digest;
pub use math::*;
pub use validation::*;
