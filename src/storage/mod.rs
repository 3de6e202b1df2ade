//! Snapshot persistence.
//!
//! The engine state serializes as one versioned snapshot; this module
//! stores and retrieves it.
//!
//! - [`InMemoryStore`]: ephemeral, for tests
//! - [`FileStore`]: JSON file persistence for single-node deployments
//! - [`SnapshotStore`]: typed snapshot access over either backend
//!
//! ```rust,ignore
//! use rusd::storage::{FileStore, SnapshotStore};
//!
//! let store = SnapshotStore::new(FileStore::new("/var/lib/rusd")?);
//! store.save(&engine.snapshot()?)?;
//! ```

pub mod backend;
pub mod snapshot;

pub use backend::{FileStore, InMemoryStore, StorageBackend, StorageKey, StorageValue};
pub use snapshot::{EngineSnapshot, SnapshotStore, SNAPSHOT_VERSION};
