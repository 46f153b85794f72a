//! The persisted root of all client-side entity state.

use crate::{EntityStore, FilterMeta, Note, NoteId, Section, SectionId, Tag};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Three entity stores plus per-section filter state.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StoreTree {
    pub sections: EntityStore<Section>,
    pub tags: EntityStore<Tag>,
    pub notes: EntityStore<Note>,
    #[serde(default)]
    pub filters: BTreeMap<SectionId, FilterMeta>,
    /// Last id handed out to a guest-mode entity.
    #[serde(default)]
    last_local_id: u64,
    #[serde(default)]
    just_created: Option<NoteId>,
}

impl StoreTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every entity and all filter state.
    ///
    /// The local id allocator keeps counting so ids are never reissued.
    pub fn reset(&mut self) {
        debug!(
            sections = self.sections.len(),
            tags = self.tags.len(),
            notes = self.notes.len(),
            "Resetting store tree"
        );
        self.sections.clear();
        self.tags.clear();
        self.notes.clear();
        self.filters.clear();
        self.just_created = None;
    }

    /// Next id for a guest-mode entity.
    ///
    /// Monotonic, and above every id currently held in any store, so it cannot
    /// collide with ids restored from disk.
    pub fn allocate_local_id(&mut self) -> u64 {
        let highest_held = self
            .sections
            .ids()
            .map(|id| id.get())
            .chain(self.tags.ids().map(|id| id.get()))
            .chain(self.notes.ids().map(|id| id.get()))
            .max()
            .unwrap_or(0);
        self.last_local_id = self.last_local_id.max(highest_held) + 1;
        self.last_local_id
    }

    pub fn mark_just_created(&mut self, note: NoteId) {
        self.just_created = Some(note);
    }

    /// Return the one-shot "just created" note and clear it.
    pub fn take_just_created(&mut self) -> Option<NoteId> {
        self.just_created.take()
    }

    pub fn just_created(&self) -> Option<NoteId> {
        self.just_created
    }

    /// Filter state of `section`, created with defaults on first access.
    pub fn filter_mut(&mut self, section: SectionId) -> &mut FilterMeta {
        self.filters.entry(section).or_default()
    }

    pub fn filter(&self, section: SectionId) -> Option<&FilterMeta> {
        self.filters.get(&section)
    }
}
