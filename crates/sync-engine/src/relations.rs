//! Tag ↔ note membership maintenance.
//!
//! Membership is stored twice: `Tag::notes` and `Note::tag_set`. Every
//! mutation that changes either side goes through [`RelationMaintainer`],
//! which repairs the inverse side inside the same store commit.

use entity_store::{Note, NoteId, SectionId, StoreTree, Tag, TagId};
use std::fmt;

/// Stateless namespace for relation-changing store operations.
pub struct RelationMaintainer;

/// A single broken membership reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Asymmetry {
    /// `tag.notes` lists the note but the note does not carry the tag.
    NoteMissingTag { tag: TagId, note: NoteId },
    /// `note.tag_set` lists the tag but the tag does not list the note.
    TagMissingNote { note: NoteId, tag: TagId },
    /// `tag.notes` references a note that does not exist.
    DanglingNote { tag: TagId, note: NoteId },
    /// `note.tag_set` references a tag that does not exist.
    DanglingTag { note: NoteId, tag: TagId },
}

impl fmt::Display for Asymmetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asymmetry::NoteMissingTag { tag, note } => {
                write!(f, "tag {} lists note {} which lacks it", tag, note)
            }
            Asymmetry::TagMissingNote { note, tag } => {
                write!(f, "note {} carries tag {} which does not list it", note, tag)
            }
            Asymmetry::DanglingNote { tag, note } => {
                write!(f, "tag {} lists missing note {}", tag, note)
            }
            Asymmetry::DanglingTag { note, tag } => {
                write!(f, "note {} carries missing tag {}", note, tag)
            }
        }
    }
}

fn push_unique<T: PartialEq>(list: &mut Vec<T>, item: T) {
    if !list.contains(&item) {
        list.push(item);
    }
}

impl RelationMaintainer {
    /// A tag was committed with an initial note list: add the tag to each
    /// listed note. Ids that do not name a note of the tag's section are
    /// dropped from the tag.
    pub fn on_tag_created(tree: &mut StoreTree, tag: TagId) {
        let Some(created) = tree.tags.get(tag) else {
            return;
        };
        let section = created.section;
        let listed = created.notes.clone();

        let mut kept = Vec::with_capacity(listed.len());
        for note_id in listed {
            match tree.notes.get_mut(note_id) {
                Some(note) if note.section == section => {
                    push_unique(&mut note.tag_set, tag);
                    push_unique(&mut kept, note_id);
                }
                _ => {}
            }
        }

        if let Some(created) = tree.tags.get_mut(tag) {
            created.notes = kept;
        }
    }

    /// A tag was removed from its store: strip it from every note it listed.
    pub fn on_tag_deleted(tree: &mut StoreTree, removed: &Tag) {
        for note_id in &removed.notes {
            if let Some(note) = tree.notes.get_mut(*note_id) {
                note.tag_set.retain(|t| *t != removed.id);
            }
        }
    }

    /// A note was removed from its store: strip it from every tag it carried.
    pub fn on_note_deleted(tree: &mut StoreTree, removed: &Note) {
        for tag_id in &removed.tag_set {
            if let Some(tag) = tree.tags.get_mut(*tag_id) {
                tag.notes.retain(|n| *n != removed.id);
            }
        }
    }

    /// Add `tag` to `note` on both sides. Returns false if either is missing.
    pub fn link(tree: &mut StoreTree, note: NoteId, tag: TagId) -> bool {
        if !tree.notes.contains(note) || !tree.tags.contains(tag) {
            return false;
        }
        if let Some(n) = tree.notes.get_mut(note) {
            push_unique(&mut n.tag_set, tag);
        }
        if let Some(t) = tree.tags.get_mut(tag) {
            push_unique(&mut t.notes, note);
        }
        true
    }

    /// Remove `tag` from `note` on both sides. Missing entities are ignored.
    pub fn unlink(tree: &mut StoreTree, note: NoteId, tag: TagId) {
        if let Some(n) = tree.notes.get_mut(note) {
            n.tag_set.retain(|t| *t != tag);
        }
        if let Some(t) = tree.tags.get_mut(tag) {
            t.notes.retain(|n| *n != note);
        }
    }

    /// Freshly fetched notes are authoritative for `section`: rebuild every
    /// tag's `notes` from the notes' `tag_set`, dropping references to tags
    /// that are not loaded.
    pub fn adopt_notes(tree: &mut StoreTree, section: SectionId) {
        let tag_ids: Vec<TagId> = tree.tags.sorted_in(section).iter().map(|t| t.id).collect();
        let note_ids: Vec<NoteId> = tree.notes.sorted_in(section).iter().map(|n| n.id).collect();

        for note_id in &note_ids {
            if let Some(note) = tree.notes.get_mut(*note_id) {
                note.tag_set.retain(|t| tag_ids.contains(t));
            }
        }

        for tag_id in &tag_ids {
            let members: Vec<NoteId> = note_ids
                .iter()
                .copied()
                .filter(|n| tree.notes.get(*n).is_some_and(|note| note.has_tag(*tag_id)))
                .collect();
            if let Some(tag) = tree.tags.get_mut(*tag_id) {
                tag.notes = merge_ordered(&tag.notes, &members);
            }
        }
    }

    /// Freshly fetched tags are authoritative for `section`: rebuild every
    /// note's `tag_set` from the tags' `notes`, dropping references to notes
    /// that are not loaded.
    pub fn adopt_tags(tree: &mut StoreTree, section: SectionId) {
        let tag_ids: Vec<TagId> = tree.tags.sorted_in(section).iter().map(|t| t.id).collect();
        let note_ids: Vec<NoteId> = tree.notes.sorted_in(section).iter().map(|n| n.id).collect();

        for tag_id in &tag_ids {
            if let Some(tag) = tree.tags.get_mut(*tag_id) {
                tag.notes.retain(|n| note_ids.contains(n));
            }
        }

        for note_id in &note_ids {
            let carried: Vec<TagId> = tag_ids
                .iter()
                .copied()
                .filter(|t| tree.tags.get(*t).is_some_and(|tag| tag.has_note(*note_id)))
                .collect();
            if let Some(note) = tree.notes.get_mut(*note_id) {
                note.tag_set = merge_ordered(&note.tag_set, &carried);
            }
        }
    }

    /// Every asymmetric or dangling membership reference in the tree.
    pub fn audit(tree: &StoreTree) -> Vec<Asymmetry> {
        let mut problems = Vec::new();

        for tag in tree.tags.sorted() {
            for note_id in &tag.notes {
                match tree.notes.get(*note_id) {
                    Some(note) if !note.has_tag(tag.id) => problems.push(Asymmetry::NoteMissingTag {
                        tag: tag.id,
                        note: *note_id,
                    }),
                    Some(_) => {}
                    None => problems.push(Asymmetry::DanglingNote {
                        tag: tag.id,
                        note: *note_id,
                    }),
                }
            }
        }

        for note in tree.notes.sorted() {
            for tag_id in &note.tag_set {
                match tree.tags.get(*tag_id) {
                    Some(tag) if !tag.has_note(note.id) => problems.push(Asymmetry::TagMissingNote {
                        note: note.id,
                        tag: *tag_id,
                    }),
                    Some(_) => {}
                    None => problems.push(Asymmetry::DanglingTag {
                        note: note.id,
                        tag: *tag_id,
                    }),
                }
            }
        }

        problems
    }
}

/// `wanted` as a list, keeping the relative order of ids already in `current`
/// and appending new ones after them.
fn merge_ordered<T: Copy + PartialEq>(current: &[T], wanted: &[T]) -> Vec<T> {
    let mut merged: Vec<T> = current.iter().copied().filter(|id| wanted.contains(id)).collect();
    for id in wanted {
        push_unique(&mut merged, *id);
    }
    merged
}
