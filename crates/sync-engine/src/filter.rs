//! Per-section tag filter.
//!
//! `active_note_ids` is always the intersection of the active tags' `notes`
//! lists, whatever the AND/OR mode; the mode only changes how notes and
//! inactive tags are filtered for display.

use entity_store::{FilterMeta, Note, NoteId, SectionId, StoreTree, Tag, TagId};
use std::collections::BTreeSet;

/// Stateless namespace for filter transitions and display queries.
pub struct FilterEngine;

impl FilterEngine {
    /// Create the section's filter state if it does not exist yet.
    pub fn activate(tree: &mut StoreTree, section: SectionId) {
        tree.filter_mut(section);
    }

    /// Activate `tag` if inactive, deactivate it otherwise.
    pub fn toggle_tag(tree: &mut StoreTree, section: SectionId, tag: TagId) {
        let meta = tree.filter_mut(section);
        if meta.is_tag_active(tag) {
            meta.active_tag_ids.retain(|t| *t != tag);
        } else {
            meta.active_tag_ids.push(tag);
        }
        Self::recompute(tree, section);
    }

    pub fn toggle_mode(tree: &mut StoreTree, section: SectionId) {
        let meta = tree.filter_mut(section);
        meta.is_and_filter = !meta.is_and_filter;
    }

    pub fn reset(tree: &mut StoreTree, section: SectionId) {
        let meta = tree.filter_mut(section);
        meta.active_tag_ids.clear();
        meta.active_note_ids.clear();
    }

    /// Recompute the cached intersection for `section`. Active tags that no
    /// longer exist are dropped first. Sections without filter state are left
    /// alone.
    pub fn recompute(tree: &mut StoreTree, section: SectionId) {
        let Some(meta) = tree.filters.get(&section) else {
            return;
        };

        let active: Vec<TagId> = meta
            .active_tag_ids
            .iter()
            .copied()
            .filter(|t| tree.tags.contains(*t))
            .collect();

        let mut lists = active
            .iter()
            .filter_map(|t| tree.tags.get(*t))
            .map(|tag| tag.notes.iter().copied().collect::<BTreeSet<NoteId>>());

        let intersection = match lists.next() {
            Some(first) => lists.fold(first, |acc, next| &acc & &next),
            None => BTreeSet::new(),
        };

        let meta = tree.filter_mut(section);
        meta.active_tag_ids = active;
        meta.active_note_ids = intersection;
    }

    /// Filter state for display; sections never activated get the defaults.
    pub fn meta(tree: &StoreTree, section: SectionId) -> FilterMeta {
        tree.filter(section).cloned().unwrap_or_default()
    }

    /// Notes of `section` the note list shows, in display order.
    ///
    /// All notes when no tag is active; otherwise notes carrying every active
    /// tag (AND) or at least one (OR).
    pub fn visible_notes(tree: &StoreTree, section: SectionId) -> Vec<&Note> {
        let meta = Self::meta(tree, section);
        tree.notes
            .sorted_in(section)
            .into_iter()
            .filter(|note| {
                if meta.active_tag_ids.is_empty() {
                    true
                } else if meta.is_and_filter {
                    meta.active_tag_ids.iter().all(|t| note.has_tag(*t))
                } else {
                    meta.active_tag_ids.iter().any(|t| note.has_tag(*t))
                }
            })
            .collect()
    }

    /// Inactive tags of `section` offered for selection.
    ///
    /// In AND mode with active tags, a tag is only offered if it shares a note
    /// with the current intersection. OR mode offers every inactive tag.
    pub fn available_tags(tree: &StoreTree, section: SectionId) -> Vec<&Tag> {
        let meta = Self::meta(tree, section);
        tree.tags
            .sorted_in(section)
            .into_iter()
            .filter(|tag| !meta.is_tag_active(tag.id))
            .filter(|tag| {
                meta.active_tag_ids.is_empty()
                    || !meta.is_and_filter
                    || tag.notes.iter().any(|n| meta.active_note_ids.contains(n))
            })
            .collect()
    }

    /// Active tags of `section` in activation order.
    pub fn active_tags(tree: &StoreTree, section: SectionId) -> Vec<&Tag> {
        Self::meta(tree, section)
            .active_tag_ids
            .iter()
            .filter_map(|t| tree.tags.get(*t))
            .collect()
    }
}
