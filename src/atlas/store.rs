//! Sled-backed asynchronous key-value persistence for world documents, plus
//! the read-only flat-text fallback consulted during migration.
//!
//! Values are stored as self-describing JSON rather than a binary codec so
//! the migrator can inspect a document's shape before committing to a type.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::OnceCell;

use crate::atlas::errors::AtlasError;

const TREE_ATLAS: &str = "atlas";

struct StoreInner {
    _db: sled::Db,
    tree: sled::Tree,
}

/// Asynchronous key-value store over sled. The backend is opened lazily on
/// first use; concurrent first calls are serialized against the same
/// in-flight open. Each key's write is atomic in isolation only, and a write
/// is durable once the returned future resolves `Ok`.
pub struct KvStore {
    path: PathBuf,
    inner: OnceCell<StoreInner>,
}

impl KvStore {
    /// Record the store location without touching the filesystem.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            inner: OnceCell::new(),
        }
    }

    /// Idempotently establish the backend connection, creating the
    /// underlying store on first use.
    pub async fn open(&self) -> Result<(), AtlasError> {
        self.tree().await.map(|_| ())
    }

    async fn tree(&self) -> Result<&sled::Tree, AtlasError> {
        let inner = self
            .inner
            .get_or_try_init(|| async {
                std::fs::create_dir_all(&self.path)?;
                let db = sled::open(&self.path)?;
                let tree = db.open_tree(TREE_ATLAS)?;
                Ok::<_, AtlasError>(StoreInner { _db: db, tree })
            })
            .await?;
        Ok(&inner.tree)
    }

    /// Fetch and deserialize the value stored under `key`. `Ok(None)` means
    /// the key is absent; bytes that fail to parse surface as
    /// [`AtlasError::Format`] so the migrator can treat them as absent.
    pub async fn get_item<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AtlasError> {
        let tree = self.tree().await?;
        match tree.get(key.as_bytes())? {
            None => Ok(None),
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        }
    }

    /// Fetch the raw JSON document under `key` without committing to a type.
    pub async fn get_raw(&self, key: &str) -> Result<Option<serde_json::Value>, AtlasError> {
        self.get_item(key).await
    }

    /// Durably associate a structured value with `key`.
    pub async fn set_item<T: Serialize>(&self, key: &str, value: &T) -> Result<(), AtlasError> {
        let tree = self.tree().await?;
        let bytes = serde_json::to_vec(value)?;
        tree.insert(key.as_bytes(), bytes)?;
        tree.flush_async().await?;
        Ok(())
    }

    /// Delete an entry. Removing an absent key is a no-op.
    pub async fn remove_item(&self, key: &str) -> Result<(), AtlasError> {
        let tree = self.tree().await?;
        tree.remove(key.as_bytes())?;
        tree.flush_async().await?;
        Ok(())
    }
}

/// Read-only view of the legacy flat-text backend: a single JSON file
/// mapping string keys to string values, as dumped from the old
/// browser-local storage. Consulted only during migration; a missing or
/// unparsable file reads as empty.
pub struct LegacyStore {
    entries: HashMap<String, String>,
}

impl LegacyStore {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub async fn load(path: &Path) -> Self {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(_) => return Self::empty(),
        };
        match serde_json::from_str::<HashMap<String, String>>(&text) {
            Ok(entries) => Self { entries },
            Err(err) => {
                warn!(
                    "legacy store {} is unparsable, treating as empty: {}",
                    path.display(),
                    err
                );
                Self::empty()
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    #[cfg(test)]
    pub fn from_entries(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }
}
