//! Read model handed to the UI collaborator.

use entity_store::{FilterMeta, Note, Section, Tag};
use serde::Serialize;
use session_guard::AuthState;

/// Everything the UI renders for one section.
#[derive(Debug, Clone, Serialize)]
pub struct SectionView {
    pub section: Section,
    pub filter: FilterMeta,
    /// All tags of the section in rank order.
    pub tags: Vec<Tag>,
    /// All notes of the section, newest rank first.
    pub notes: Vec<Note>,
    /// Notes passing the current tag filter.
    pub visible_notes: Vec<Note>,
    pub active_tags: Vec<Tag>,
    /// Inactive tags still offered for selection.
    pub available_tags: Vec<Tag>,
}

/// Tags of a note's section split by whether the note carries them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NoteTags {
    pub owned: Vec<Tag>,
    pub unowned: Vec<Tag>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub username: String,
    pub email: String,
    pub authenticated: bool,
    pub state: AuthState,
}
