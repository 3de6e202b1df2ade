//! Versioned engine snapshots.
//!
//! A snapshot is the whole [`EngineState`] behind one schema version
//! number. Old snapshots are migrated forward at parse time, and a
//! snapshot only unpacks after its audit chain re-verifies, so a restore
//! can never quietly resurrect tampered books.

use serde::{Deserialize, Serialize};

use crate::audit::AuditLog;
use crate::engine::EngineState;
use crate::error::{Error, Result};
use crate::storage::backend::StorageBackend;

/// Current snapshot schema version
pub const SNAPSHOT_VERSION: u32 = 2;

/// Storage key the engine snapshot lives under
const SNAPSHOT_KEY: &[u8] = b"engine/snapshot";

// ═══════════════════════════════════════════════════════════════════════════════
// SNAPSHOT
// ═══════════════════════════════════════════════════════════════════════════════

/// Serializable capture of the full engine state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSnapshot {
    /// Schema version the snapshot was written with
    pub version: u32,
    state: EngineState,
}

impl EngineSnapshot {
    /// Capture the state behind the engine's lock
    pub(crate) fn capture(state: &EngineState) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            state: state.clone(),
        }
    }

    /// Unpack into engine state.
    ///
    /// The parameters are re-validated and the audit chain re-verified;
    /// a snapshot that fails either is refused.
    pub(crate) fn into_state(self) -> Result<EngineState> {
        if self.version != SNAPSHOT_VERSION {
            return Err(Error::Storage(format!(
                "snapshot version {} not supported, expected {}",
                self.version, SNAPSHOT_VERSION
            )));
        }
        self.state.config.params.validate()?;
        if !self.state.audit.verify_integrity()? {
            return Err(Error::Storage(
                "snapshot audit chain does not verify".into(),
            ));
        }
        Ok(self.state)
    }

    /// Render as pretty JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Parse from JSON, migrating older schema versions forward
    pub fn from_json(json: &str) -> Result<Self> {
        let mut value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| Error::Deserialization(e.to_string()))?;
        migrate(&mut value)?;
        serde_json::from_value(value).map_err(|e| Error::Deserialization(e.to_string()))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MIGRATIONS
// ═══════════════════════════════════════════════════════════════════════════════

fn migrate(value: &mut serde_json::Value) -> Result<()> {
    let version = value
        .get("version")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| Error::Deserialization("snapshot missing version".into()))?;

    match version {
        1 => migrate_v1_to_v2(value),
        v if v == SNAPSHOT_VERSION as u64 => Ok(()),
        v => Err(Error::Storage(format!(
            "snapshot version {} not supported, expected {}",
            v, SNAPSHOT_VERSION
        ))),
    }
}

/// Version 1 predates the audit log and the per-asset quote stamp.
/// Both get empty defaults; history before the upgrade simply starts at
/// record zero.
fn migrate_v1_to_v2(value: &mut serde_json::Value) -> Result<()> {
    let state = value
        .get_mut("state")
        .and_then(|s| s.as_object_mut())
        .ok_or_else(|| Error::Deserialization("snapshot missing state".into()))?;

    if !state.contains_key("audit") {
        let empty = serde_json::to_value(AuditLog::new())
            .map_err(|e| Error::Serialization(e.to_string()))?;
        state.insert("audit".into(), empty);
    }

    if let Some(slots) = state
        .get_mut("collateral")
        .and_then(|c| c.get_mut("registry"))
        .and_then(|r| r.get_mut("slots"))
        .and_then(|s| s.as_array_mut())
    {
        for slot in slots {
            if let Some(asset) = slot.as_object_mut() {
                asset.entry("last_price").or_insert(serde_json::Value::Null);
            }
        }
    }

    value["version"] = SNAPSHOT_VERSION.into();
    tracing::info!(from = 1, to = SNAPSHOT_VERSION, "snapshot schema migrated");
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// SNAPSHOT STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// Persists the engine snapshot through any storage backend
pub struct SnapshotStore<B: StorageBackend> {
    backend: B,
}

impl<B: StorageBackend> SnapshotStore<B> {
    /// Wrap a backend
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Write the snapshot and flush
    pub fn save(&self, snapshot: &EngineSnapshot) -> Result<()> {
        let json = snapshot.to_json()?;
        self.backend.set(SNAPSHOT_KEY, json.as_bytes())?;
        self.backend.flush()
    }

    /// Load the stored snapshot, if any, migrating old versions forward
    pub fn load(&self) -> Result<Option<EngineSnapshot>> {
        match self.backend.get(SNAPSHOT_KEY)? {
            Some(bytes) => {
                let json = String::from_utf8(bytes)
                    .map_err(|e| Error::Deserialization(format!("snapshot encoding: {}", e)))?;
                Ok(Some(EngineSnapshot::from_json(&json)?))
            }
            None => Ok(None),
        }
    }

    /// Whether a snapshot has been stored
    pub fn has_snapshot(&self) -> Result<bool> {
        self.backend.exists(SNAPSHOT_KEY)
    }

    /// Access the underlying backend
    pub fn backend(&self) -> &B {
        &self.backend
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
