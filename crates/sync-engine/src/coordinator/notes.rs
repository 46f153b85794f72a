use super::{already_gone, normalize_label, FetchKey};
use crate::engine::EngineInner;
use crate::error::{EngineError, EngineResult};
use crate::filter::FilterEngine;
use crate::relations::RelationMaintainer;
use crate::throttle::FieldUpdate;
use entity_store::{NewNote, Note, NoteId, NotePatch, SectionId, TagId};
use std::sync::Arc;
use tracing::{debug, info};

/// Direction of a structural tag change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Membership {
    Add,
    Remove,
}

impl EngineInner {
    /// Replace the section's notes with the server's and rebuild the tags'
    /// side of the membership from them.
    pub(crate) async fn fetch_notes(&self, section: SectionId) -> EngineResult<()> {
        if !self.is_authenticated() {
            debug!(section_id = %section, "Guest mode, nothing to fetch");
            return Ok(());
        }

        let key = FetchKey::Notes(section);
        let ticket = self.fetches.issue(key);
        let epoch = self.state.epoch();
        self.begin_remote().await?;
        let notes = self.remote.fetch_notes(section).await?;

        if !self.fetches.is_latest(key, ticket) {
            debug!(section_id = %section, ticket, "Dropping superseded note fetch");
            return Ok(());
        }

        self.state.commit_in(epoch, |tree| {
            let notes = notes.into_iter().filter(|note| note.section == section);
            tree.notes.replace_scope(Some(section), notes);
            RelationMaintainer::adopt_notes(tree, section);
            FilterEngine::recompute(tree, section);
        });
        self.end_remote();
        Ok(())
    }

    /// Create an empty note on top of the section and flag it as just
    /// created.
    pub(crate) async fn create_note(&self, section: SectionId) -> EngineResult<()> {
        let rank = self.state.read(|tree| {
            if !tree.sections.contains(section) {
                return Err(EngineError::Validation(format!("unknown section {}", section)));
            }
            Ok(tree.notes.next_rank(Some(section)))
        })?;

        let id = if self.is_authenticated() {
            let epoch = self.state.epoch();
            let draft = NewNote {
                section,
                rank,
                title: String::new(),
                content: String::new(),
            };
            self.begin_remote().await?;
            let mut note = self.remote.create_note(&draft).await?;
            let id = note.id;
            // A new note carries no tags until a structural change adds one.
            note.tag_set.clear();
            let committed = self.state.commit_in(epoch, |tree| {
                tree.notes.upsert_one(note);
                tree.mark_just_created(id);
            });
            self.end_remote();
            if committed.is_none() {
                return Ok(());
            }
            id
        } else {
            self.state.commit(|tree| {
                let id = NoteId(tree.allocate_local_id());
                tree.notes.upsert_one(Note {
                    id,
                    title: String::new(),
                    content: String::new(),
                    section,
                    rank,
                    tag_set: Vec::new(),
                });
                tree.mark_just_created(id);
                id
            })
        };

        info!(note_id = %id, section_id = %section, "Note created");
        Ok(())
    }

    pub(crate) fn update_note_title(
        self: &Arc<Self>,
        id: NoteId,
        title: String,
    ) -> EngineResult<()> {
        let patch = NotePatch {
            title: Some(title.clone()),
            ..NotePatch::default()
        };
        if !self.state.commit(|tree| tree.notes.patch(id, &patch)) {
            return Err(EngineError::Validation(format!("unknown note {}", id)));
        }
        self.throttle_update(FieldUpdate::NoteTitle(id, title));
        Ok(())
    }

    pub(crate) fn update_note_content(
        self: &Arc<Self>,
        id: NoteId,
        content: String,
    ) -> EngineResult<()> {
        let patch = NotePatch {
            content: Some(content.clone()),
            ..NotePatch::default()
        };
        if !self.state.commit(|tree| tree.notes.patch(id, &patch)) {
            return Err(EngineError::Validation(format!("unknown note {}", id)));
        }
        self.throttle_update(FieldUpdate::NoteContent(id, content));
        Ok(())
    }

    pub(crate) async fn add_tag_to_note(&self, note: NoteId, tag: TagId) -> EngineResult<()> {
        self.change_membership(note, tag, Membership::Add).await
    }

    pub(crate) async fn remove_tag_from_note(&self, note: NoteId, tag: TagId) -> EngineResult<()> {
        self.change_membership(note, tag, Membership::Remove).await
    }

    /// Attach the tag labelled `label`, creating it when the section has none.
    ///
    /// Lookup and creation happen under `tag_creation`, so two concurrent
    /// calls with the same label end up sharing one tag.
    pub(crate) async fn add_tag_by_label(&self, note: NoteId, label: &str) -> EngineResult<()> {
        let label = normalize_label(label)?;
        let serialized = self.tag_creation.lock().await;
        let (section, existing) = self.state.read(|tree| {
            let found = tree
                .notes
                .get(note)
                .ok_or_else(|| EngineError::Validation(format!("unknown note {}", note)))?;
            let existing = tree
                .tags
                .sorted_in(found.section)
                .into_iter()
                .find(|tag| tag.label == label)
                .map(|tag| tag.id);
            Ok::<_, EngineError>((found.section, existing))
        })?;

        match existing {
            Some(tag) => {
                drop(serialized);
                self.add_tag_to_note(note, tag).await
            }
            None => self
                .create_tag_serialized(section, &label, vec![note])
                .await
                .map(|_| ()),
        }
    }

    /// Structural tag add/remove. Never throttled; in authenticated mode the
    /// change is committed on both sides only after the server accepts the
    /// note's new tag set.
    async fn change_membership(
        &self,
        note: NoteId,
        tag: TagId,
        change: Membership,
    ) -> EngineResult<()> {
        let _serialized = self.structural.lock().await;
        let epoch = self.state.epoch();

        let planned = self.state.read(|tree| {
            let found = tree
                .notes
                .get(note)
                .ok_or_else(|| EngineError::Validation(format!("unknown note {}", note)))?;
            let target = tree
                .tags
                .get(tag)
                .ok_or_else(|| EngineError::Validation(format!("unknown tag {}", tag)))?;
            if found.section != target.section {
                return Err(EngineError::Validation(format!(
                    "tag {} and note {} belong to different sections",
                    tag, note
                )));
            }

            let carried = found.has_tag(tag);
            let tag_set: Vec<TagId> = match change {
                Membership::Add if carried => return Ok(None),
                Membership::Remove if !carried => return Ok(None),
                Membership::Add => found.tag_set.iter().copied().chain([tag]).collect(),
                Membership::Remove => found.tag_set.iter().copied().filter(|t| *t != tag).collect(),
            };
            Ok(Some((found.section, tag_set)))
        })?;

        let Some((section, tag_set)) = planned else {
            debug!(note_id = %note, tag_id = %tag, change = ?change, "Membership already in place");
            return Ok(());
        };

        if self.is_authenticated() {
            let patch = NotePatch {
                tag_set: Some(tag_set),
                ..NotePatch::default()
            };
            self.begin_remote().await?;
            self.remote.update_note(note, &patch).await?;
            self.end_remote();
        }

        self.state.commit_in(epoch, |tree| {
            match change {
                Membership::Add => {
                    RelationMaintainer::link(tree, note, tag);
                }
                Membership::Remove => RelationMaintainer::unlink(tree, note, tag),
            }
            FilterEngine::recompute(tree, section);
        });
        debug!(note_id = %note, tag_id = %tag, change = ?change, "Membership updated");
        Ok(())
    }

    /// Remove the note locally, strip it from its tags, then tell the server.
    pub(crate) async fn delete_note(&self, id: NoteId) -> EngineResult<()> {
        let removed = self.state.commit(|tree| {
            let removed = tree.notes.remove_one(id)?;
            RelationMaintainer::on_note_deleted(tree, &removed);
            FilterEngine::recompute(tree, removed.section);
            Some(removed)
        });
        if removed.is_none() {
            debug!(note_id = %id, "Note already removed");
            return Ok(());
        }
        info!(note_id = %id, "Note deleted");

        if self.is_authenticated() {
            self.begin_remote().await?;
            match self.remote.delete_note(id).await {
                Err(e) if !already_gone(&e) => return Err(e.into()),
                _ => self.end_remote(),
            }
        }
        Ok(())
    }
}
