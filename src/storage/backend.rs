//! Key-value storage backends.
//!
//! [`InMemoryStore`] backs tests and ephemeral deployments. [`FileStore`]
//! persists through a single JSON file with hex-encoded keys and values,
//! cached in memory and written out on [`StorageBackend::flush`] or drop.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::{Error, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// STORAGE TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Key type for storage operations
pub type StorageKey = Vec<u8>;

/// Value type for storage operations
pub type StorageValue = Vec<u8>;

/// Byte-oriented storage the snapshot layer writes through
pub trait StorageBackend: Send + Sync {
    /// Get a value by key
    fn get(&self, key: &[u8]) -> Result<Option<StorageValue>>;

    /// Set a value for a key
    fn set(&self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Delete a key, reporting whether it existed
    fn delete(&self, key: &[u8]) -> Result<bool>;

    /// Check whether a key exists
    fn exists(&self, key: &[u8]) -> Result<bool>;

    /// All stored keys
    fn keys(&self) -> Result<Vec<StorageKey>>;

    /// Push pending writes to durable storage
    fn flush(&self) -> Result<()>;

    /// Drop all stored data
    fn clear(&self) -> Result<()>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// IN-MEMORY STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// Ephemeral storage for tests and single-run tools
#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.data.read().map(|d| d.len()).unwrap_or(0)
    }

    /// Whether the store holds nothing
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StorageBackend for InMemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<StorageValue>> {
        let data = self.data.read().map_err(|_| Error::Lock)?;
        Ok(data.get(key).cloned())
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut data = self.data.write().map_err(|_| Error::Lock)?;
        data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<bool> {
        let mut data = self.data.write().map_err(|_| Error::Lock)?;
        Ok(data.remove(key).is_some())
    }

    fn exists(&self, key: &[u8]) -> Result<bool> {
        let data = self.data.read().map_err(|_| Error::Lock)?;
        Ok(data.contains_key(key))
    }

    fn keys(&self) -> Result<Vec<StorageKey>> {
        let data = self.data.read().map_err(|_| Error::Lock)?;
        Ok(data.keys().cloned().collect())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut data = self.data.write().map_err(|_| Error::Lock)?;
        data.clear();
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FILE STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// JSON-file storage under a base directory.
///
/// The whole map lives in memory; `flush` rewrites `data.json` when
/// anything changed since the last write.
#[derive(Debug)]
pub struct FileStore {
    base_path: PathBuf,
    cache: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
    dirty: RwLock<bool>,
}

impl FileStore {
    /// Open a store at the given directory, creating it if needed and
    /// loading any existing data file.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        if !base_path.exists() {
            fs::create_dir_all(&base_path)
                .map_err(|e| Error::Storage(format!("create storage directory: {}", e)))?;
        }

        let store = Self {
            base_path,
            cache: RwLock::new(HashMap::new()),
            dirty: RwLock::new(false),
        };
        store.load_from_disk()?;
        Ok(store)
    }

    fn data_file_path(&self) -> PathBuf {
        self.base_path.join("data.json")
    }

    fn load_from_disk(&self) -> Result<()> {
        let path = self.data_file_path();
        if !path.exists() {
            return Ok(());
        }

        let file =
            File::open(&path).map_err(|e| Error::Storage(format!("open data file: {}", e)))?;
        let reader = BufReader::new(file);
        let data: HashMap<String, String> = serde_json::from_reader(reader)
            .map_err(|e| Error::Deserialization(format!("parse data file: {}", e)))?;

        let mut cache = self.cache.write().map_err(|_| Error::Lock)?;
        for (key_hex, value_hex) in data {
            let key = hex::decode(&key_hex)
                .map_err(|e| Error::Deserialization(format!("stored key: {}", e)))?;
            let value = hex::decode(&value_hex)
                .map_err(|e| Error::Deserialization(format!("stored value: {}", e)))?;
            cache.insert(key, value);
        }
        Ok(())
    }

    fn save_to_disk(&self) -> Result<()> {
        let cache = self.cache.read().map_err(|_| Error::Lock)?;
        let data: HashMap<String, String> = cache
            .iter()
            .map(|(k, v)| (hex::encode(k), hex::encode(v)))
            .collect();

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(self.data_file_path())
            .map_err(|e| Error::Storage(format!("open data file for writing: {}", e)))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &data)
            .map_err(|e| Error::Storage(format!("write data file: {}", e)))?;

        let mut dirty = self.dirty.write().map_err(|_| Error::Lock)?;
        *dirty = false;
        Ok(())
    }
}

impl StorageBackend for FileStore {
    fn get(&self, key: &[u8]) -> Result<Option<StorageValue>> {
        let cache = self.cache.read().map_err(|_| Error::Lock)?;
        Ok(cache.get(key).cloned())
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut cache = self.cache.write().map_err(|_| Error::Lock)?;
        cache.insert(key.to_vec(), value.to_vec());
        drop(cache);

        let mut dirty = self.dirty.write().map_err(|_| Error::Lock)?;
        *dirty = true;
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<bool> {
        let mut cache = self.cache.write().map_err(|_| Error::Lock)?;
        let existed = cache.remove(key).is_some();
        drop(cache);

        if existed {
            let mut dirty = self.dirty.write().map_err(|_| Error::Lock)?;
            *dirty = true;
        }
        Ok(existed)
    }

    fn exists(&self, key: &[u8]) -> Result<bool> {
        let cache = self.cache.read().map_err(|_| Error::Lock)?;
        Ok(cache.contains_key(key))
    }

    fn keys(&self) -> Result<Vec<StorageKey>> {
        let cache = self.cache.read().map_err(|_| Error::Lock)?;
        Ok(cache.keys().cloned().collect())
    }

    fn flush(&self) -> Result<()> {
        let dirty = *self.dirty.read().map_err(|_| Error::Lock)?;
        if dirty {
            self.save_to_disk()?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut cache = self.cache.write().map_err(|_| Error::Lock)?;
        cache.clear();
        drop(cache);

        let mut dirty = self.dirty.write().map_err(|_| Error::Lock)?;
        *dirty = true;
        Ok(())
    }
}

impl Drop for FileStore {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
