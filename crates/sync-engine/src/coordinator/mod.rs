//! Per-intent orchestration: authorize, request or apply locally, reconcile,
//! fan out relation updates.
//!
//! Every remote leg follows the same shape: read the store epoch, call
//! `authorize()` right before the request, then commit the response only if
//! the stores were not reset in the meantime.

mod fields;
mod notes;
mod sections;
mod session;
mod tags;

use crate::engine::EngineInner;
use crate::error::{EngineError, EngineResult};
use crate::status::SyncStatus;
use entity_store::SectionId;
use parking_lot::Mutex;
use remote_authority::RemoteError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// What a fetch-all is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum FetchKey {
    Sections,
    Tags(SectionId),
    Notes(SectionId),
}

/// Latest-wins bookkeeping for fetch-all requests.
///
/// Each fetch takes a ticket when it starts; only the holder of the newest
/// ticket for a key may commit its response.
#[derive(Default)]
pub(crate) struct FetchTracker {
    next: AtomicU64,
    latest: Mutex<HashMap<FetchKey, u64>>,
}

impl FetchTracker {
    pub(crate) fn issue(&self, key: FetchKey) -> u64 {
        let ticket = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        self.latest.lock().insert(key, ticket);
        ticket
    }

    pub(crate) fn is_latest(&self, key: FetchKey, ticket: u64) -> bool {
        self.latest.lock().get(&key) == Some(&ticket)
    }
}

/// Lower-cased, trimmed tag label. Empty labels are rejected.
pub(crate) fn normalize_label(label: &str) -> EngineResult<String> {
    let normalized = label.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(EngineError::Validation("tag label is empty".to_string()));
    }
    Ok(normalized)
}

/// A 404 on delete means someone got there first.
pub(crate) fn already_gone(err: &RemoteError) -> bool {
    matches!(err, RemoteError::Status { status: 404, .. })
}

impl EngineInner {
    /// Authorize and mark the start of a remote leg.
    pub(crate) async fn begin_remote(&self) -> EngineResult<()> {
        self.guard.authorize().await?;
        self.status.set(SyncStatus::Syncing);
        Ok(())
    }

    pub(crate) fn end_remote(&self) {
        self.status.set(SyncStatus::Synced);
    }

    pub(crate) fn is_authenticated(&self) -> bool {
        self.guard.is_authenticated()
    }
}
