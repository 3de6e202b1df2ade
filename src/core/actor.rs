//! Actor identities and capability-based access control.
//!
//! Every engine operation is performed by an [`ActorId`], an opaque 32-byte
//! identity. Administrative operations additionally require a capability
//! grant checked through [`AccessController`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::error::{Error, Result};
use crate::utils::constants::ACTOR_ID_LENGTH;
use crate::utils::digest::Digest;

// ═══════════════════════════════════════════════════════════════════════════════
// ACTOR ID
// ═══════════════════════════════════════════════════════════════════════════════

/// Opaque 32-byte actor identity
///
/// Serializes as a hex string so it can key JSON maps and appear in
/// audit exports.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId([u8; ACTOR_ID_LENGTH]);

impl Serialize for ActorId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for ActorId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        if bytes.len() != ACTOR_ID_LENGTH {
            return Err(serde::de::Error::custom(format!(
                "expected {} bytes, got {}",
                ACTOR_ID_LENGTH,
                bytes.len()
            )));
        }
        let mut arr = [0u8; ACTOR_ID_LENGTH];
        arr.copy_from_slice(&bytes);
        Ok(ActorId(arr))
    }
}

impl ActorId {
    /// Create an actor identity from raw bytes
    pub fn from_bytes(bytes: [u8; ACTOR_ID_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Create an actor identity from a slice (must be exactly 32 bytes)
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        if slice.len() != ACTOR_ID_LENGTH {
            return Err(Error::InvalidParameter {
                name: "actor_id".into(),
                reason: format!("expected {} bytes, got {}", ACTOR_ID_LENGTH, slice.len()),
            });
        }
        let mut bytes = [0u8; ACTOR_ID_LENGTH];
        bytes.copy_from_slice(slice);
        Ok(Self(bytes))
    }

    /// Derive a deterministic identity from a label.
    ///
    /// Two calls with the same label always produce the same identity.
    pub fn derive(label: &str) -> Self {
        Self(*Digest::sha256(label.as_bytes()).as_bytes())
    }

    /// Get the identity as bytes
    pub fn as_bytes(&self) -> &[u8; ACTOR_ID_LENGTH] {
        &self.0
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Create from hex string
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| Error::InvalidParameter {
            name: "actor_id".into(),
            reason: e.to_string(),
        })?;
        Self::from_slice(&bytes)
    }

    /// Short form for log messages (first 8 hex chars)
    pub fn short(&self) -> String {
        self.to_hex()[..8].to_string()
    }
}

impl fmt::Debug for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActorId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl AsRef<[u8]> for ActorId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CAPABILITIES
// ═══════════════════════════════════════════════════════════════════════════════

/// Administrative capabilities
///
/// Ordinary position operations (deposit, withdraw, mint, burn) need no
/// capability. Liquidation is open to any actor other than the position
/// owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Capability {
    /// Register, update, and deactivate collateral assets
    ManageAssets,
    /// Change engine parameters and pause or resume operation
    SetParameters,
    /// Record manual balance corrections
    AuditAdjust,
    /// Grant and revoke capabilities
    ManageAccess,
}

impl Capability {
    /// All capabilities, for bootstrapping a root actor
    pub fn all() -> [Capability; 4] {
        [
            Capability::ManageAssets,
            Capability::SetParameters,
            Capability::AuditAdjust,
            Capability::ManageAccess,
        ]
    }

    /// Human-readable capability name
    pub fn name(&self) -> &'static str {
        match self {
            Capability::ManageAssets => "manage_assets",
            Capability::SetParameters => "set_parameters",
            Capability::AuditAdjust => "audit_adjust",
            Capability::ManageAccess => "manage_access",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ACCESS CONTROLLER
// ═══════════════════════════════════════════════════════════════════════════════

/// Capability grants by actor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessController {
    grants: HashMap<ActorId, BTreeSet<Capability>>,
}

impl AccessController {
    /// Create an empty controller with no grants
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a controller with a root actor holding every capability
    pub fn with_root(root: ActorId) -> Self {
        let mut controller = Self::new();
        for capability in Capability::all() {
            controller.grants.entry(root).or_default().insert(capability);
        }
        controller
    }

    /// Grant a capability to an actor
    pub fn grant(&mut self, actor: ActorId, capability: Capability) {
        self.grants.entry(actor).or_default().insert(capability);
    }

    /// Revoke a capability from an actor.
    ///
    /// The last `ManageAccess` holder cannot be revoked, otherwise no
    /// actor could ever change grants again.
    pub fn revoke(&mut self, actor: &ActorId, capability: Capability) -> Result<()> {
        if capability == Capability::ManageAccess && self.holders_of(capability) <= 1 {
            return Err(Error::InvalidParameter {
                name: "capability".into(),
                reason: "cannot revoke the last manage_access holder".into(),
            });
        }

        if let Some(caps) = self.grants.get_mut(actor) {
            caps.remove(&capability);
            if caps.is_empty() {
                self.grants.remove(actor);
            }
        }
        Ok(())
    }

    /// Check whether an actor holds a capability
    pub fn has(&self, actor: &ActorId, capability: Capability) -> bool {
        self.grants
            .get(actor)
            .map(|caps| caps.contains(&capability))
            .unwrap_or(false)
    }

    /// Require a capability, failing with `Unauthorized` if absent
    pub fn require(&self, actor: &ActorId, capability: Capability) -> Result<()> {
        if self.has(actor, capability) {
            Ok(())
        } else {
            Err(Error::Unauthorized(format!(
                "actor {} lacks capability {}",
                actor.short(),
                capability.name()
            )))
        }
    }

    /// Capabilities held by an actor
    pub fn capabilities_of(&self, actor: &ActorId) -> Vec<Capability> {
        self.grants
            .get(actor)
            .map(|caps| caps.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of actors holding a capability
    pub fn holders_of(&self, capability: Capability) -> usize {
        self.grants
            .values()
            .filter(|caps| caps.contains(&capability))
            .count()
    }

    /// Number of actors with at least one grant
    pub fn actor_count(&self) -> usize {
        self.grants.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_deterministic() {
        let a = ActorId::derive("alice");
        let b = ActorId::derive("alice");
        let c = ActorId::derive("bob");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_hex_round_trip() {
        let actor = ActorId::derive("alice");
        let hex = actor.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(ActorId::from_hex(&hex).unwrap(), actor);
        assert_eq!(actor.short().len(), 8);
    }

    #[test]
    fn test_from_slice_length_check() {
        assert!(ActorId::from_slice(&[7u8; 32]).is_ok());
        assert!(ActorId::from_slice(&[7u8; 20]).is_err());
    }

    #[test]
    fn test_root_has_all_capabilities() {
        let root = ActorId::derive("root");
        let controller = AccessController::with_root(root);

        for capability in Capability::all() {
            assert!(controller.has(&root, capability));
            assert!(controller.require(&root, capability).is_ok());
        }
    }

    #[test]
    fn test_require_without_grant_fails() {
        let controller = AccessController::new();
        let actor = ActorId::derive("nobody");

        let result = controller.require(&actor, Capability::ManageAssets);
        assert!(matches!(result, Err(Error::Unauthorized(_))));
    }

    #[test]
    fn test_grant_and_revoke() {
        let root = ActorId::derive("root");
        let operator = ActorId::derive("operator");
        let mut controller = AccessController::with_root(root);

        controller.grant(operator, Capability::ManageAssets);
        assert!(controller.has(&operator, Capability::ManageAssets));
        assert!(!controller.has(&operator, Capability::SetParameters));

        controller.revoke(&operator, Capability::ManageAssets).unwrap();
        assert!(!controller.has(&operator, Capability::ManageAssets));
        assert_eq!(controller.actor_count(), 1);
    }

    #[test]
    fn test_last_access_manager_protected() {
        let root = ActorId::derive("root");
        let mut controller = AccessController::with_root(root);

        let result = controller.revoke(&root, Capability::ManageAccess);
        assert!(result.is_err());
        assert!(controller.has(&root, Capability::ManageAccess));

        // With a second holder the revoke goes through
        let backup = ActorId::derive("backup");
        controller.grant(backup, Capability::ManageAccess);
        controller.revoke(&root, Capability::ManageAccess).unwrap();
        assert!(!controller.has(&root, Capability::ManageAccess));
    }

    #[test]
    fn test_serde_round_trip() {
        let root = ActorId::derive("root");
        let mut controller = AccessController::with_root(root);
        controller.grant(ActorId::derive("auditor"), Capability::AuditAdjust);

        let json = serde_json::to_string(&controller).unwrap();
        let back: AccessController = serde_json::from_str(&json).unwrap();

        assert!(back.has(&root, Capability::ManageAccess));
        assert!(back.has(&ActorId::derive("auditor"), Capability::AuditAdjust));
    }
}
