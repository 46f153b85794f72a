use super::{already_gone, FetchKey};
use crate::engine::EngineInner;
use crate::error::{EngineError, EngineResult};
use crate::filter::FilterEngine;
use crate::throttle::FieldUpdate;
use entity_store::{NewSection, Section, SectionId, SectionPatch};
use std::sync::Arc;
use tracing::{debug, info};

impl EngineInner {
    /// Replace the section list with the server's, cascading removals.
    pub(crate) async fn fetch_sections(&self) -> EngineResult<()> {
        if !self.is_authenticated() {
            debug!("Guest mode, nothing to fetch");
            return Ok(());
        }

        let ticket = self.fetches.issue(FetchKey::Sections);
        let epoch = self.state.epoch();
        self.begin_remote().await?;
        let sections = self.remote.fetch_sections().await?;

        if !self.fetches.is_latest(FetchKey::Sections, ticket) {
            debug!(ticket, "Dropping superseded section fetch");
            return Ok(());
        }

        let count = sections.len();
        self.state.commit_in(epoch, |tree| {
            for dropped in tree.sections.replace_scope(None, sections) {
                tree.tags.remove_scope(dropped.id);
                tree.notes.remove_scope(dropped.id);
                tree.filters.remove(&dropped.id);
            }
        });
        self.end_remote();
        debug!(count, "Sections fetched");
        Ok(())
    }

    pub(crate) async fn create_section(&self, name: String) -> EngineResult<()> {
        let rank = self.state.read(|tree| tree.sections.next_rank(None));

        let section = if self.is_authenticated() {
            let epoch = self.state.epoch();
            self.begin_remote().await?;
            let section = self
                .remote
                .create_section(&NewSection { name, rank })
                .await?;
            let committed = self
                .state
                .commit_in(epoch, |tree| tree.sections.upsert_one(section.clone()));
            self.end_remote();
            if committed.is_none() {
                return Ok(());
            }
            section
        } else {
            self.state.commit(|tree| {
                let section = Section {
                    id: SectionId(tree.allocate_local_id()),
                    name,
                    rank,
                };
                tree.sections.upsert_one(section.clone());
                section
            })
        };

        info!(section_id = %section.id, name = %section.name, "Section created");
        Ok(())
    }

    pub(crate) fn rename_section(
        self: &Arc<Self>,
        id: SectionId,
        name: String,
    ) -> EngineResult<()> {
        let patch = SectionPatch {
            name: Some(name.clone()),
            ..SectionPatch::default()
        };
        if !self.state.commit(|tree| tree.sections.patch(id, &patch)) {
            return Err(EngineError::Validation(format!("unknown section {}", id)));
        }
        self.throttle_update(FieldUpdate::SectionName(id, name));
        Ok(())
    }

    /// Remove the section with its tags, notes and filter state, then tell
    /// the server. A failed remote delete does not bring anything back.
    pub(crate) async fn delete_section(&self, id: SectionId) -> EngineResult<()> {
        let removed = self.state.commit(|tree| {
            let removed = tree.sections.remove_one(id)?;
            let tags = tree.tags.remove_scope(id).len();
            let notes = tree.notes.remove_scope(id).len();
            tree.filters.remove(&id);
            debug!(section_id = %id, tags, notes, "Cascaded section removal");
            Some(removed)
        });
        if removed.is_none() {
            debug!(section_id = %id, "Section already removed");
            return Ok(());
        }
        info!(section_id = %id, "Section deleted");

        if self.is_authenticated() {
            self.begin_remote().await?;
            match self.remote.delete_section(id).await {
                Err(e) if !already_gone(&e) => return Err(e.into()),
                _ => self.end_remote(),
            }
        }
        Ok(())
    }

    /// The section became visible: set up its filter and pull its content.
    pub(crate) async fn activate_section(&self, id: SectionId) -> EngineResult<()> {
        let exists = self.state.commit(|tree| {
            let exists = tree.sections.contains(id);
            if exists {
                FilterEngine::activate(tree, id);
            }
            exists
        });
        if !exists {
            return Err(EngineError::Validation(format!("unknown section {}", id)));
        }

        if self.is_authenticated() {
            self.fetch_tags(id).await?;
            self.fetch_notes(id).await?;
        }
        Ok(())
    }
}
