//! Durable storage for the notebook client.
//!
//! Two backends implement [`DurableStorage`]:
//! - [`FileStorage`]: a JSON map file rewritten atomically on every change
//! - [`MemoryStorage`]: process-local, used by tests and ephemeral runs
//!
//! [`StateVault`] layers typed session/store-tree access on top.

mod file;
mod keys;
mod memory;
mod traits;
mod vault;

pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use traits::DurableStorage;
pub use vault::StateVault;

use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backing file is unreadable or malformed
    #[error("Corrupt storage file: {0}")]
    Corrupt(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
