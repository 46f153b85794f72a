//! Typed access to the persisted session and store tree.

use crate::{DurableStorage, StorageError, StorageKeys, StorageResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// High-level API for the client's durable state.
///
/// Generic over the payload types so this crate stays independent of the
/// entity and session models.
#[derive(Clone)]
pub struct StateVault {
    storage: Arc<dyn DurableStorage>,
}

impl StateVault {
    pub fn new(storage: Arc<dyn DurableStorage>) -> Self {
        Self { storage }
    }

    // ==========================================
    // Session
    // ==========================================

    pub fn save_session<T: Serialize>(&self, session: &T) -> StorageResult<()> {
        self.put_json(StorageKeys::SESSION, session)
    }

    pub fn load_session<T: DeserializeOwned>(&self) -> StorageResult<Option<T>> {
        self.get_json(StorageKeys::SESSION)
    }

    pub fn clear_session(&self) -> StorageResult<()> {
        self.storage.delete(StorageKeys::SESSION)?;
        Ok(())
    }

    // ==========================================
    // Store tree
    // ==========================================

    pub fn save_store_tree<T: Serialize>(&self, tree: &T) -> StorageResult<()> {
        self.put_json(StorageKeys::STORE_TREE, tree)
    }

    pub fn load_store_tree<T: DeserializeOwned>(&self) -> StorageResult<Option<T>> {
        self.get_json(StorageKeys::STORE_TREE)
    }

    /// Remove everything this vault owns.
    pub fn clear_all(&self) -> StorageResult<()> {
        self.storage.delete(StorageKeys::SESSION)?;
        self.storage.delete(StorageKeys::STORE_TREE)?;
        Ok(())
    }

    fn put_json<T: Serialize>(&self, key: &str, value: &T) -> StorageResult<()> {
        let json =
            serde_json::to_string(value).map_err(|e| StorageError::Encoding(e.to_string()))?;
        self.storage.set(key, &json)
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        match self.storage.get(key)? {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| StorageError::Encoding(format!("{}: {}", key, e))),
            None => Ok(None),
        }
    }
}
