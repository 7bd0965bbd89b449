//! Durable key-value storage for the last-used account, network and platform.
//!
//! Keys live under a host-scoped namespace: `<origin>.address`,
//! `<origin>.network` and `<origin>.platform`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use crate::error::{Result, WalletError};

/// Key-value storage backend.
///
/// Reads are on demand and writes are immediate, like browser local storage.
pub trait Storage: Send + Sync {
    /// Read a value.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value.
    fn remove(&self, key: &str) -> Result<()>;
}

/// The three persisted keys for one origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    /// Last connected account.
    pub account: String,
    /// Last known network.
    pub network: String,
    /// Name of the last connected plugin.
    pub platform: String,
}

impl StorageKeys {
    /// Build the keys for a host origin.
    #[must_use]
    pub fn for_origin(origin: &str) -> Self {
        Self {
            account: format!("{origin}.address"),
            network: format!("{origin}.network"),
            platform: format!("{origin}.platform"),
        }
    }
}

/// In-memory storage.
///
/// Fast but not persistent across restarts.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create a new memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// JSON file storage.
///
/// The whole map is kept in memory and rewritten on every change.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    values: RwLock<HashMap<String, String>>,
}

impl FileStorage {
    /// Open (or lazily create) a storage file.
    ///
    /// # Errors
    ///
    /// Returns [`WalletError::Storage`] when the file exists but cannot be
    /// read, or [`WalletError::Json`] when it is not a JSON object of strings.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(WalletError::storage)?;
            if content.trim().is_empty() {
                HashMap::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            HashMap::new()
        };
        debug!(path = %path.display(), entries = values.len(), "opened file storage");
        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, values: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(WalletError::storage)?;
        }
        let content = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, content).map_err(WalletError::storage)
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        self.flush(&values)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        if values.remove(key).is_some() {
            self.flush(&values)?;
        }
        Ok(())
    }
}
