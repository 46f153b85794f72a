//! Entity records, creation drafts and partial patches.

use crate::{NoteId, SectionId, TagId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ============================================================================
// Section
// ============================================================================

/// Top-level grouping of tags and notes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    pub name: String,
    pub rank: i64,
}

/// A section to be created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSection {
    pub name: String,
    pub rank: i64,
}

/// Partial update of a section. `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<i64>,
}

// ============================================================================
// Tag
// ============================================================================

/// A label attached to notes of one section.
///
/// `label` is lower-cased and unique within the section. `notes` mirrors the
/// `tag_set` of every note carrying this tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub label: String,
    pub section: SectionId,
    pub rank: i64,
    #[serde(default)]
    pub notes: Vec<NoteId>,
}

impl Tag {
    pub fn has_note(&self, note: NoteId) -> bool {
        self.notes.contains(&note)
    }
}

/// A tag to be created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTag {
    pub label: String,
    pub section: SectionId,
    pub rank: i64,
    #[serde(default)]
    pub notes: Vec<NoteId>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Vec<NoteId>>,
}

// ============================================================================
// Note
// ============================================================================

/// A note. Notes sort by descending rank, newest first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub section: SectionId,
    pub rank: i64,
    #[serde(default)]
    pub tag_set: Vec<TagId>,
}

impl Note {
    pub fn has_tag(&self, tag: TagId) -> bool {
        self.tag_set.contains(&tag)
    }
}

/// A note to be created. Title and content start empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNote {
    pub section: SectionId,
    pub rank: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_set: Option<Vec<TagId>>,
}

// ============================================================================
// Filter meta
// ============================================================================

/// Per-section tag filter state.
///
/// `active_note_ids` is a cache: the intersection of the `notes` lists of the
/// tags in `active_tag_ids`, empty when no tag is active.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterMeta {
    pub is_and_filter: bool,
    pub active_tag_ids: Vec<TagId>,
    pub active_note_ids: BTreeSet<NoteId>,
}

impl Default for FilterMeta {
    fn default() -> Self {
        Self {
            is_and_filter: true,
            active_tag_ids: Vec::new(),
            active_note_ids: BTreeSet::new(),
        }
    }
}

impl FilterMeta {
    pub fn is_tag_active(&self, tag: TagId) -> bool {
        self.active_tag_ids.contains(&tag)
    }
}
