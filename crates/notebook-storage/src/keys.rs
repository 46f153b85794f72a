//! Storage key constants.

/// Storage keys used by the notebook client
pub struct StorageKeys;

impl StorageKeys {
    /// Session credentials and identity (JSON)
    pub const SESSION: &'static str = "session";

    /// Whole normalized entity store tree (JSON)
    pub const STORE_TREE: &'static str = "store_tree";
}
