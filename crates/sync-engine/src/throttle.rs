//! Per-field trailing throttle for text edits.
//!
//! One window per field kind, shared by every entity of that kind. The first
//! edit opens the window; edits arriving while it is open replace the pending
//! value, whichever entity they target. When the window closes exactly one
//! request goes out, carrying the latest value.
//!
//! Every edit also bumps a per-entity generation, so a response can tell
//! whether the value it confirms is still the newest local one.

use entity_store::{NoteId, SectionId, TagId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThrottledField {
    NoteTitle,
    NoteContent,
    TagLabel,
    SectionName,
}

impl ThrottledField {
    /// Operation name reported when the trailing send fails.
    pub fn operation(&self) -> &'static str {
        match self {
            ThrottledField::NoteTitle => "update_note_title",
            ThrottledField::NoteContent => "update_note_content",
            ThrottledField::TagLabel => "rename_tag",
            ThrottledField::SectionName => "rename_section",
        }
    }
}

/// A field edit waiting for its window to close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FieldUpdate {
    NoteTitle(NoteId, String),
    NoteContent(NoteId, String),
    TagLabel(TagId, String),
    SectionName(SectionId, String),
}

impl FieldUpdate {
    pub(crate) fn field(&self) -> ThrottledField {
        match self {
            FieldUpdate::NoteTitle(..) => ThrottledField::NoteTitle,
            FieldUpdate::NoteContent(..) => ThrottledField::NoteContent,
            FieldUpdate::TagLabel(..) => ThrottledField::TagLabel,
            FieldUpdate::SectionName(..) => ThrottledField::SectionName,
        }
    }

    /// Raw id of the targeted entity.
    pub(crate) fn target(&self) -> u64 {
        match self {
            FieldUpdate::NoteTitle(id, _) | FieldUpdate::NoteContent(id, _) => id.get(),
            FieldUpdate::TagLabel(id, _) => id.get(),
            FieldUpdate::SectionName(id, _) => id.get(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ThrottleWindows {
    pub title: Duration,
    pub content: Duration,
    pub label: Duration,
}

/// Generation of the latest local edit of one field of one entity.
type EditKey = (ThrottledField, u64);

#[derive(Default)]
struct Slots {
    pending: HashMap<ThrottledField, FieldUpdate>,
    generations: HashMap<EditKey, u64>,
}

pub(crate) struct FieldThrottle {
    windows: ThrottleWindows,
    slots: Mutex<Slots>,
}

impl FieldThrottle {
    pub(crate) fn new(windows: ThrottleWindows) -> Self {
        Self {
            windows,
            slots: Mutex::new(Slots::default()),
        }
    }

    pub(crate) fn window(&self, field: ThrottledField) -> Duration {
        match field {
            ThrottledField::NoteTitle => self.windows.title,
            ThrottledField::NoteContent => self.windows.content,
            ThrottledField::TagLabel | ThrottledField::SectionName => self.windows.label,
        }
    }

    /// Park `update` in its field's slot and bump the entity's edit
    /// generation. Returns true when this call opened the window, in which
    /// case the caller owns the trailing send.
    pub(crate) fn offer(&self, update: FieldUpdate) -> bool {
        let field = update.field();
        let mut slots = self.slots.lock();
        *slots
            .generations
            .entry((field, update.target()))
            .or_default() += 1;
        let opened = !slots.pending.contains_key(&field);
        slots.pending.insert(field, update);
        opened
    }

    /// Close the window and take the latest value with its edit generation.
    pub(crate) fn take(&self, field: ThrottledField) -> Option<(FieldUpdate, u64)> {
        let mut slots = self.slots.lock();
        let update = slots.pending.remove(&field)?;
        let generation = slots
            .generations
            .get(&(field, update.target()))
            .copied()
            .unwrap_or_default();
        Some((update, generation))
    }

    /// Whether `generation` is still the latest local edit of the field.
    /// False once the entity was edited again, even if that newer edit has
    /// since been displaced from the slot by another entity's edit.
    pub(crate) fn is_latest(&self, field: ThrottledField, target: u64, generation: u64) -> bool {
        self.slots
            .lock()
            .generations
            .get(&(field, target))
            .is_some_and(|latest| *latest == generation)
    }

    /// Drop every pending edit.
    pub(crate) fn clear(&self) {
        let mut slots = self.slots.lock();
        slots.pending.clear();
        slots.generations.clear();
    }
}
