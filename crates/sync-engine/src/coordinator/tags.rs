use super::{already_gone, normalize_label, FetchKey};
use crate::engine::EngineInner;
use crate::error::{EngineError, EngineResult};
use crate::filter::FilterEngine;
use crate::relations::RelationMaintainer;
use crate::throttle::FieldUpdate;
use entity_store::{NewTag, NoteId, SectionId, StoreTree, Tag, TagId, TagPatch};
use std::sync::Arc;
use tracing::{debug, info};

fn label_taken(tree: &StoreTree, section: SectionId, label: &str, except: Option<TagId>) -> bool {
    tree.tags
        .sorted_in(section)
        .iter()
        .any(|tag| tag.label == label && Some(tag.id) != except)
}

impl EngineInner {
    /// Replace the section's tags with the server's and rebuild the notes'
    /// side of the membership from them.
    pub(crate) async fn fetch_tags(&self, section: SectionId) -> EngineResult<()> {
        if !self.is_authenticated() {
            debug!(section_id = %section, "Guest mode, nothing to fetch");
            return Ok(());
        }

        let key = FetchKey::Tags(section);
        let ticket = self.fetches.issue(key);
        let epoch = self.state.epoch();
        self.begin_remote().await?;
        let tags = self.remote.fetch_tags(section).await?;

        if !self.fetches.is_latest(key, ticket) {
            debug!(section_id = %section, ticket, "Dropping superseded tag fetch");
            return Ok(());
        }

        self.state.commit_in(epoch, |tree| {
            let tags = tags.into_iter().filter(|tag| tag.section == section);
            tree.tags.replace_scope(Some(section), tags);
            RelationMaintainer::adopt_tags(tree, section);
            FilterEngine::recompute(tree, section);
        });
        self.end_remote();
        Ok(())
    }

    pub(crate) async fn create_tag(
        &self,
        section: SectionId,
        label: &str,
        notes: Vec<NoteId>,
    ) -> EngineResult<TagId> {
        let _serialized = self.tag_creation.lock().await;
        self.create_tag_serialized(section, label, notes).await
    }

    /// Create a tag. The caller holds `tag_creation`.
    pub(super) async fn create_tag_serialized(
        &self,
        section: SectionId,
        label: &str,
        notes: Vec<NoteId>,
    ) -> EngineResult<TagId> {
        let label = normalize_label(label)?;
        let rank = self.state.read(|tree| {
            if !tree.sections.contains(section) {
                return Err(EngineError::Validation(format!("unknown section {}", section)));
            }
            if label_taken(tree, section, &label, None) {
                return Err(EngineError::Validation(format!(
                    "tag '{}' already exists in section {}",
                    label, section
                )));
            }
            Ok(tree.tags.next_rank(Some(section)))
        })?;

        let id = if self.is_authenticated() {
            let epoch = self.state.epoch();
            let draft = NewTag {
                label,
                section,
                rank,
                notes,
            };
            self.begin_remote().await?;
            let tag = self.remote.create_tag(&draft).await?;
            let id = tag.id;
            let committed = self.state.commit_in(epoch, |tree| {
                // A fetch may have brought in the same label meanwhile.
                if label_taken(tree, section, &tag.label, Some(id)) {
                    return false;
                }
                tree.tags.upsert_one(tag);
                RelationMaintainer::on_tag_created(tree, id);
                FilterEngine::recompute(tree, section);
                true
            });
            self.end_remote();
            if committed == Some(false) {
                return Err(EngineError::Validation(format!(
                    "tag label already exists in section {}",
                    section
                )));
            }
            id
        } else {
            self.state.commit(|tree| {
                let id = TagId(tree.allocate_local_id());
                tree.tags.upsert_one(Tag {
                    id,
                    label,
                    section,
                    rank,
                    notes,
                });
                RelationMaintainer::on_tag_created(tree, id);
                FilterEngine::recompute(tree, section);
                id
            })
        };

        info!(tag_id = %id, section_id = %section, "Tag created");
        Ok(id)
    }

    pub(crate) fn rename_tag(self: &Arc<Self>, id: TagId, label: &str) -> EngineResult<()> {
        let label = normalize_label(label)?;
        self.state.commit(|tree| {
            let section = tree
                .tags
                .get(id)
                .map(|tag| tag.section)
                .ok_or_else(|| EngineError::Validation(format!("unknown tag {}", id)))?;
            if label_taken(tree, section, &label, Some(id)) {
                return Err(EngineError::Validation(format!(
                    "tag '{}' already exists in section {}",
                    label, section
                )));
            }
            let patch = TagPatch {
                label: Some(label.clone()),
                ..TagPatch::default()
            };
            tree.tags.patch(id, &patch);
            Ok(())
        })?;

        self.throttle_update(FieldUpdate::TagLabel(id, label));
        Ok(())
    }

    /// Remove the tag locally, strip it from its notes and from the filter,
    /// then tell the server.
    pub(crate) async fn delete_tag(&self, id: TagId) -> EngineResult<()> {
        let removed = self.state.commit(|tree| {
            let removed = tree.tags.remove_one(id)?;
            RelationMaintainer::on_tag_deleted(tree, &removed);
            FilterEngine::recompute(tree, removed.section);
            Some(removed)
        });
        if removed.is_none() {
            debug!(tag_id = %id, "Tag already removed");
            return Ok(());
        }
        info!(tag_id = %id, "Tag deleted");

        if self.is_authenticated() {
            self.begin_remote().await?;
            match self.remote.delete_tag(id).await {
                Err(e) if !already_gone(&e) => return Err(e.into()),
                _ => self.end_remote(),
            }
        }
        Ok(())
    }

    pub(crate) fn toggle_tag_filter(&self, section: SectionId, tag: TagId) -> EngineResult<()> {
        self.state.commit(|tree| {
            if !tree.tags.get(tag).is_some_and(|t| t.section == section) {
                return Err(EngineError::Validation(format!(
                    "tag {} is not in section {}",
                    tag, section
                )));
            }
            FilterEngine::toggle_tag(tree, section, tag);
            Ok(())
        })
    }

    pub(crate) fn toggle_filter_mode(&self, section: SectionId) -> EngineResult<()> {
        self.state.commit(|tree| FilterEngine::toggle_mode(tree, section));
        Ok(())
    }

    pub(crate) fn reset_filter(&self, section: SectionId) -> EngineResult<()> {
        self.state.commit(|tree| FilterEngine::reset(tree, section));
        Ok(())
    }
}
