//! Append-only audit log.
//!
//! Every state mutation appends one typed record. Records chain through
//! SHA-256 digests, so an exported log can be checked for truncation or
//! tampering by recomputing the chain. The JSON export renders timestamps
//! as RFC3339 and stablecoin amounts as exact decimal strings for human
//! auditors; internal bookkeeping stays in raw integers.

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::core::actor::ActorId;
use crate::core::amount::{AssetAmount, StableAmount};
use crate::core::asset::AssetId;
use crate::error::{Error, Result};
use crate::utils::digest::Digest;

// ═══════════════════════════════════════════════════════════════════════════════
// RECORD KINDS
// ═══════════════════════════════════════════════════════════════════════════════

/// Classification of audit records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditKind {
    /// Collateral entered the reserve
    Deposit,
    /// Collateral left the reserve to its owner
    Withdrawal,
    /// Stablecoin was issued
    Mint,
    /// Stablecoin was retired
    Burn,
    /// A position was liquidated
    Liquidation,
    /// Manual correction of recorded balances
    AuditAdjustment,
    /// A collateral asset was registered
    AssetAdded,
    /// An asset's configuration changed
    AssetUpdated,
    /// An asset was deactivated
    AssetDeactivated,
    /// An engine parameter changed
    ParameterChanged,
}

impl AuditKind {
    /// Record kind as a string
    pub fn name(&self) -> &'static str {
        match self {
            Self::Deposit => "Deposit",
            Self::Withdrawal => "Withdrawal",
            Self::Mint => "Mint",
            Self::Burn => "Burn",
            Self::Liquidation => "Liquidation",
            Self::AuditAdjustment => "AuditAdjustment",
            Self::AssetAdded => "AssetAdded",
            Self::AssetUpdated => "AssetUpdated",
            Self::AssetDeactivated => "AssetDeactivated",
            Self::ParameterChanged => "ParameterChanged",
        }
    }
}

impl std::fmt::Display for AuditKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RECORDS
// ═══════════════════════════════════════════════════════════════════════════════

/// Payload for a record about to be appended
#[derive(Debug, Clone)]
pub struct AuditEntry {
    /// Kind of operation
    pub kind: AuditKind,
    /// Unix timestamp of the operation
    pub timestamp: u64,
    /// Actor the operation was performed for or by
    pub actor: ActorId,
    /// Asset involved, if any
    pub asset: Option<AssetId>,
    /// Collateral moved, in asset base units (zero when not applicable)
    pub collateral: AssetAmount,
    /// Stablecoin moved, in micro-units (zero when not applicable)
    pub stablecoin: StableAmount,
    /// Free-text description
    pub description: String,
}

/// One committed record in the chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Position in the log, starting at zero
    pub seq: u64,
    /// Kind of operation
    pub kind: AuditKind,
    /// Unix timestamp of the operation
    pub timestamp: u64,
    /// Actor the operation was performed for or by
    pub actor: ActorId,
    /// Asset involved, if any
    pub asset: Option<AssetId>,
    /// Collateral moved, in asset base units
    pub collateral: AssetAmount,
    /// Stablecoin moved, in micro-units
    pub stablecoin: StableAmount,
    /// Free-text description
    pub description: String,
    /// SHA-256 digest chaining this record to its predecessor
    pub digest: Digest,
}

impl AuditRecord {
    /// Recompute the digest this record should carry given its predecessor
    pub fn expected_digest(&self, previous: &Digest) -> Result<Digest> {
        chain_digest(
            previous,
            self.seq,
            self.kind,
            self.timestamp,
            &self.actor,
            &self.asset,
            self.collateral,
            self.stablecoin,
            &self.description,
        )
    }
}

#[allow(clippy::too_many_arguments)]
fn chain_digest(
    previous: &Digest,
    seq: u64,
    kind: AuditKind,
    timestamp: u64,
    actor: &ActorId,
    asset: &Option<AssetId>,
    collateral: AssetAmount,
    stablecoin: StableAmount,
    description: &str,
) -> Result<Digest> {
    let payload = bincode::serialize(&(
        seq,
        kind,
        timestamp,
        actor,
        asset,
        collateral,
        stablecoin,
        description,
    ))
    .map_err(|e| Error::Serialization(e.to_string()))?;
    Ok(previous.chain(&payload))
}

// ═══════════════════════════════════════════════════════════════════════════════
// AUDIT LOG
// ═══════════════════════════════════════════════════════════════════════════════

/// Append-only, digest-chained record log
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditLog {
    records: Vec<AuditRecord>,
    head: Digest,
}

impl AuditLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, chaining it to the current head.
    ///
    /// Returns the sequence number assigned to the record.
    pub fn append(&mut self, entry: AuditEntry) -> Result<u64> {
        let seq = self.records.len() as u64;
        let digest = chain_digest(
            &self.head,
            seq,
            entry.kind,
            entry.timestamp,
            &entry.actor,
            &entry.asset,
            entry.collateral,
            entry.stablecoin,
            &entry.description,
        )?;

        self.records.push(AuditRecord {
            seq,
            kind: entry.kind,
            timestamp: entry.timestamp,
            actor: entry.actor,
            asset: entry.asset,
            collateral: entry.collateral,
            stablecoin: entry.stablecoin,
            description: entry.description,
            digest,
        });
        self.head = digest;
        Ok(seq)
    }

    /// All records in order
    pub fn records(&self) -> &[AuditRecord] {
        &self.records
    }

    /// Records of one kind, in order
    pub fn filter_by_kind(&self, kind: AuditKind) -> Vec<&AuditRecord> {
        self.records.iter().filter(|r| r.kind == kind).collect()
    }

    /// Records involving one actor, in order
    pub fn records_for(&self, actor: &ActorId) -> Vec<&AuditRecord> {
        self.records.iter().filter(|r| &r.actor == actor).collect()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Digest of the latest record, or the zero digest for an empty log
    pub fn head(&self) -> Digest {
        self.head
    }

    /// Recompute the whole chain and compare against the stored digests.
    ///
    /// Returns false if any record was altered, reordered, or removed.
    pub fn verify_integrity(&self) -> Result<bool> {
        let mut previous = Digest::zero();
        for (index, record) in self.records.iter().enumerate() {
            if record.seq != index as u64 {
                return Ok(false);
            }
            if record.expected_digest(&previous)? != record.digest {
                return Ok(false);
            }
            previous = record.digest;
        }
        Ok(previous == self.head)
    }

    /// Export the log as pretty-printed JSON for auditors
    pub fn export_json(&self) -> Result<String> {
        let entries: Vec<AuditExportEntry> = self.records.iter().map(AuditExportEntry::from).collect();
        serde_json::to_string_pretty(&entries).map_err(|e| Error::Serialization(e.to_string()))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXPORT
// ═══════════════════════════════════════════════════════════════════════════════

/// Auditor-facing rendering of one record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditExportEntry {
    /// Sequence number
    pub seq: u64,
    /// Record kind
    pub kind: String,
    /// RFC3339 timestamp
    pub time: String,
    /// Actor identity in hex
    pub actor: String,
    /// Asset symbol, if any
    pub asset: Option<String>,
    /// Collateral moved in asset base units
    pub collateral_units: u64,
    /// Stablecoin moved as an exact decimal string
    pub stablecoin: String,
    /// Free-text description
    pub description: String,
    /// Chained digest in hex
    pub digest: String,
}

impl From<&AuditRecord> for AuditExportEntry {
    fn from(record: &AuditRecord) -> Self {
        Self {
            seq: record.seq,
            kind: record.kind.name().to_string(),
            time: format_rfc3339(record.timestamp),
            actor: record.actor.to_hex(),
            asset: record.asset.as_ref().map(|a| a.to_string()),
            collateral_units: record.collateral.units(),
            stablecoin: record.stablecoin.to_decimal_string(),
            description: record.description.clone(),
            digest: record.digest.to_hex(),
        }
    }
}

fn format_rfc3339(timestamp: u64) -> String {
    match Utc.timestamp_opt(timestamp as i64, 0).single() {
        Some(datetime) => datetime.to_rfc3339(),
        None => timestamp.to_string(),
    }
}
