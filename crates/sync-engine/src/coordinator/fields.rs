//! Trailing send of throttled field edits.

use crate::engine::EngineInner;
use crate::error::EngineResult;
use crate::throttle::{FieldUpdate, ThrottledField};
use entity_store::{NotePatch, SectionPatch, TagPatch};
use std::sync::Arc;
use tracing::debug;

impl EngineInner {
    /// Queue `update` for the server. The optimistic value must already be
    /// committed. Guest edits never leave the device.
    pub(crate) fn throttle_update(self: &Arc<Self>, update: FieldUpdate) {
        if !self.is_authenticated() {
            return;
        }

        let field = update.field();
        if !self.throttle.offer(update) {
            debug!(field = ?field, "Edit folded into open throttle window");
            return;
        }

        let engine = self.clone();
        tokio::spawn(async move { engine.flush_field(field).await });
    }

    /// Send every pending edit now instead of waiting for its window.
    pub(crate) async fn flush_pending(&self) {
        for field in [
            ThrottledField::NoteTitle,
            ThrottledField::NoteContent,
            ThrottledField::TagLabel,
            ThrottledField::SectionName,
        ] {
            let Some((update, generation)) = self.throttle.take(field) else {
                continue;
            };
            if let Err(e) = self.send_field_update(update, generation).await {
                self.report(field.operation(), e);
            }
        }
    }

    async fn flush_field(self: Arc<Self>, field: ThrottledField) {
        tokio::time::sleep(self.throttle.window(field)).await;

        let Some((update, generation)) = self.throttle.take(field) else {
            debug!(field = ?field, "Throttle window closed empty");
            return;
        };
        if let Err(e) = self.send_field_update(update, generation).await {
            self.report(field.operation(), e);
        }
    }

    /// Send one field edit and reconcile that field with the response,
    /// unless the entity's field was edited again after `generation`.
    async fn send_field_update(&self, update: FieldUpdate, generation: u64) -> EngineResult<()> {
        let field = update.field();
        let target = update.target();
        let epoch = self.state.epoch();
        self.begin_remote().await?;

        match update {
            FieldUpdate::NoteTitle(id, title) => {
                let patch = NotePatch {
                    title: Some(title),
                    ..NotePatch::default()
                };
                let saved = self.remote.update_note(id, &patch).await?;
                self.reconcile(epoch, field, target, generation, |tree| {
                    tree.notes.patch(
                        id,
                        &NotePatch {
                            title: Some(saved.title),
                            ..NotePatch::default()
                        },
                    );
                });
            }
            FieldUpdate::NoteContent(id, content) => {
                let patch = NotePatch {
                    content: Some(content),
                    ..NotePatch::default()
                };
                let saved = self.remote.update_note(id, &patch).await?;
                self.reconcile(epoch, field, target, generation, |tree| {
                    tree.notes.patch(
                        id,
                        &NotePatch {
                            content: Some(saved.content),
                            ..NotePatch::default()
                        },
                    );
                });
            }
            FieldUpdate::TagLabel(id, label) => {
                let patch = TagPatch {
                    label: Some(label),
                    ..TagPatch::default()
                };
                let saved = self.remote.update_tag(id, &patch).await?;
                self.reconcile(epoch, field, target, generation, |tree| {
                    tree.tags.patch(
                        id,
                        &TagPatch {
                            label: Some(saved.label),
                            ..TagPatch::default()
                        },
                    );
                });
            }
            FieldUpdate::SectionName(id, name) => {
                let patch = SectionPatch {
                    name: Some(name),
                    ..SectionPatch::default()
                };
                let saved = self.remote.update_section(id, &patch).await?;
                self.reconcile(epoch, field, target, generation, |tree| {
                    tree.sections.patch(
                        id,
                        &SectionPatch {
                            name: Some(saved.name),
                            ..SectionPatch::default()
                        },
                    );
                });
            }
        }

        self.end_remote();
        Ok(())
    }

    fn reconcile(
        &self,
        epoch: u64,
        field: ThrottledField,
        target: u64,
        generation: u64,
        apply: impl FnOnce(&mut entity_store::StoreTree),
    ) {
        if !self.throttle.is_latest(field, target, generation) {
            debug!(field = ?field, target, generation, "Edited since sent, keeping local value");
            return;
        }
        self.state.commit_in(epoch, apply);
    }
}
