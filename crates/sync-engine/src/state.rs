//! Shared engine state: the store tree, its durable copy, and queued error
//! signals.

use crate::error::{EngineError, ErrorSignal};
use crate::relations::RelationMaintainer;
use entity_store::StoreTree;
use notebook_storage::StateVault;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error, warn};

/// Operation name attached to signals raised by the commit path itself.
const COMMIT_OPERATION: &str = "commit";

pub(crate) struct EngineState {
    tree: Mutex<StoreTree>,
    vault: StateVault,
    /// Bumped on every reset. Remote results obtained under an older epoch
    /// belong to a session whose content has been discarded.
    epoch: AtomicU64,
    signals: Mutex<Vec<ErrorSignal>>,
}

impl EngineState {
    /// Restore the persisted tree, or start empty when there is none.
    pub(crate) fn restore(vault: StateVault) -> Self {
        let tree = match vault.load_store_tree::<StoreTree>() {
            Ok(Some(tree)) => {
                debug!(
                    sections = tree.sections.len(),
                    tags = tree.tags.len(),
                    notes = tree.notes.len(),
                    "Restored store tree"
                );
                tree
            }
            Ok(None) => StoreTree::new(),
            Err(e) => {
                warn!(error = %e, "Discarding unreadable store tree");
                StoreTree::new()
            }
        };

        let state = Self {
            tree: Mutex::new(tree),
            vault,
            epoch: AtomicU64::new(0),
            signals: Mutex::new(Vec::new()),
        };
        state.check(&state.tree.lock());
        state
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&StoreTree) -> R) -> R {
        f(&self.tree.lock())
    }

    /// Apply one store mutation, audit the relations and persist the tree.
    pub(crate) fn commit<R>(&self, f: impl FnOnce(&mut StoreTree) -> R) -> R {
        let mut tree = self.tree.lock();
        let out = f(&mut tree);
        self.check(&tree);
        self.persist(&tree);
        out
    }

    /// Like [`commit`](Self::commit), but only if no reset happened since
    /// `epoch` was read.
    pub(crate) fn commit_in<R>(
        &self,
        epoch: u64,
        f: impl FnOnce(&mut StoreTree) -> R,
    ) -> Option<R> {
        let mut tree = self.tree.lock();
        if self.epoch() != epoch {
            debug!(epoch, current = self.epoch(), "Discarding result for reset stores");
            return None;
        }
        let out = f(&mut tree);
        self.check(&tree);
        self.persist(&tree);
        Some(out)
    }

    /// Drop every entity and filter, and invalidate in-flight results.
    pub(crate) fn reset(&self) {
        let mut tree = self.tree.lock();
        self.epoch.fetch_add(1, Ordering::SeqCst);
        tree.reset();
        self.persist(&tree);
    }

    pub(crate) fn push_signal(&self, signal: ErrorSignal) {
        self.signals.lock().push(signal);
    }

    pub(crate) fn take_signals(&self) -> Vec<ErrorSignal> {
        std::mem::take(&mut *self.signals.lock())
    }

    fn check(&self, tree: &StoreTree) {
        let problems = RelationMaintainer::audit(tree);
        if problems.is_empty() {
            return;
        }
        let summary = problems
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        error!(count = problems.len(), problems = %summary, "Tag/note membership is asymmetric");
        self.push_signal(ErrorSignal::new(
            COMMIT_OPERATION,
            &EngineError::RelationInconsistency(summary),
        ));
    }

    fn persist(&self, tree: &StoreTree) {
        if let Err(e) = self.vault.save_store_tree(tree) {
            warn!(error = %e, "Failed to persist store tree");
            self.push_signal(ErrorSignal::new(COMMIT_OPERATION, &EngineError::from(e)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use entity_store::{Section, SectionId};
    use notebook_storage::MemoryStorage;
    use std::sync::Arc;

    fn vault() -> StateVault {
        StateVault::new(Arc::new(MemoryStorage::new()))
    }

    fn section(id: u64) -> Section {
        Section {
            id: SectionId(id),
            name: format!("s{}", id),
            rank: id as i64,
        }
    }

    #[test]
    fn test_commit_persists_tree() {
        let vault = vault();
        let state = EngineState::restore(vault.clone());
        state.commit(|tree| tree.sections.upsert_one(section(1)));

        let restored = EngineState::restore(vault);
        assert!(restored.read(|tree| tree.sections.contains(SectionId(1))));
    }

    #[test]
    fn test_commit_in_drops_results_after_reset() {
        let state = EngineState::restore(vault());
        let epoch = state.epoch();
        state.reset();

        let applied = state.commit_in(epoch, |tree| tree.sections.upsert_one(section(1)));
        assert!(applied.is_none());
        assert!(state.read(|tree| tree.sections.is_empty()));

        let applied = state.commit_in(state.epoch(), |tree| tree.sections.upsert_one(section(1)));
        assert!(applied.is_some());
    }

    #[test]
    fn test_asymmetric_commit_raises_signal() {
        use entity_store::{NoteId, Tag, TagId};

        let state = EngineState::restore(vault());
        state.commit(|tree| {
            tree.tags.upsert_one(Tag {
                id: TagId(1),
                label: "x".into(),
                section: SectionId(1),
                rank: 0,
                notes: vec![NoteId(7)],
            })
        });

        let signals = state.take_signals();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].kind, crate::ErrorKind::RelationInconsistency);
        assert!(state.take_signals().is_empty());
    }
}
