//! Global sync status published to the UI.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Syncing,
    Synced,
    Offline,
}

/// Single-value status channel. Readers see the latest value only.
pub(crate) struct StatusReporter {
    tx: watch::Sender<SyncStatus>,
}

impl StatusReporter {
    pub(crate) fn new(initial: SyncStatus) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub(crate) fn set(&self, status: SyncStatus) {
        let previous = self.tx.send_replace(status);
        if previous != status {
            debug!(from = ?previous, to = ?status, "Sync status changed");
        }
    }

    pub(crate) fn get(&self) -> SyncStatus {
        *self.tx.borrow()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.tx.subscribe()
    }
}
