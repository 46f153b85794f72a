//! Tag filter driven through intents.

use super::harness::TestHarness;
use crate::{ErrorKind, Intent};
use entity_store::{NoteId, SectionId, TagId};
use std::collections::BTreeSet;

struct Fixture {
    harness: TestHarness,
    section: SectionId,
    notes: Vec<NoteId>,
    t1: TagId,
    t2: TagId,
}

/// Notes 1-4; t1 = {1, 2, 3}, t2 = {2, 3, 4}.
async fn fixture() -> Fixture {
    let harness = TestHarness::guest();
    let section = harness.create_section("s").await;
    let mut notes = Vec::new();
    for _ in 0..4 {
        notes.push(harness.create_note(section).await);
    }
    let t1 = harness
        .create_tag(section, "t1", &[notes[0], notes[1], notes[2]])
        .await;
    let t2 = harness
        .create_tag(section, "t2", &[notes[1], notes[2], notes[3]])
        .await;
    harness
        .engine
        .handle(Intent::ActivateSection { id: section })
        .await;
    Fixture {
        harness,
        section,
        notes,
        t1,
        t2,
    }
}

impl Fixture {
    async fn toggle(&self, tag: TagId) {
        self.harness
            .engine
            .handle(Intent::ToggleTagFilter {
                section: self.section,
                tag,
            })
            .await;
    }

    fn active_notes(&self) -> BTreeSet<NoteId> {
        self.harness
            .engine
            .section_view(self.section)
            .unwrap()
            .filter
            .active_note_ids
    }

    fn notes(&self, indexes: &[usize]) -> BTreeSet<NoteId> {
        indexes.iter().map(|i| self.notes[*i]).collect()
    }
}

#[tokio::test]
async fn test_intersection_of_active_tags() {
    let f = fixture().await;

    f.toggle(f.t1).await;
    f.toggle(f.t2).await;
    assert_eq!(f.active_notes(), f.notes(&[1, 2]));

    f.toggle(f.t2).await;
    assert_eq!(f.active_notes(), f.notes(&[0, 1, 2]));

    f.toggle(f.t1).await;
    assert!(f.active_notes().is_empty());
}

#[tokio::test]
async fn test_or_mode_shows_union_of_notes() {
    let f = fixture().await;
    f.harness
        .engine
        .handle(Intent::ToggleFilterMode { section: f.section })
        .await;
    f.toggle(f.t1).await;
    f.toggle(f.t2).await;

    let view = f.harness.engine.section_view(f.section).unwrap();
    assert!(!view.filter.is_and_filter);
    assert_eq!(view.visible_notes.len(), 4);
    assert_eq!(f.active_notes(), f.notes(&[1, 2]));
}

#[tokio::test]
async fn test_relation_change_refreshes_intersection() {
    let f = fixture().await;
    f.toggle(f.t1).await;

    f.harness
        .engine
        .handle(Intent::RemoveTagFromNote {
            note: f.notes[0],
            tag: f.t1,
        })
        .await;
    assert_eq!(f.active_notes(), f.notes(&[1, 2]));

    f.harness.engine.handle(Intent::DeleteNote { id: f.notes[1] }).await;
    assert_eq!(f.active_notes(), f.notes(&[2]));
}

#[tokio::test]
async fn test_deleting_active_tag_deactivates_it() {
    let f = fixture().await;
    f.toggle(f.t1).await;
    f.toggle(f.t2).await;

    f.harness.engine.handle(Intent::DeleteTag { id: f.t2 }).await;

    let view = f.harness.engine.section_view(f.section).unwrap();
    assert_eq!(view.filter.active_tag_ids, vec![f.t1]);
    assert_eq!(f.active_notes(), f.notes(&[0, 1, 2]));
}

#[tokio::test]
async fn test_reset_clears_selection() {
    let f = fixture().await;
    f.toggle(f.t1).await;
    f.harness
        .engine
        .handle(Intent::ResetFilter { section: f.section })
        .await;

    let view = f.harness.engine.section_view(f.section).unwrap();
    assert!(view.filter.active_tag_ids.is_empty());
    assert!(view.filter.active_note_ids.is_empty());
    assert_eq!(view.visible_notes.len(), 4);
    assert_eq!(view.available_tags.len(), 2);
}

#[tokio::test]
async fn test_toggle_of_foreign_tag_is_rejected() {
    let f = fixture().await;
    let other = f.harness.create_section("other").await;
    f.harness
        .engine
        .handle(Intent::ToggleTagFilter {
            section: other,
            tag: f.t1,
        })
        .await;
    assert_eq!(f.harness.engine.take_errors()[0].kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_note_tags_and_suggestions() {
    let f = fixture().await;
    let extra = f.harness.create_tag(f.section, "Tea", &[]).await;

    let tags = f.harness.engine.note_tags(f.notes[0]);
    let owned: Vec<TagId> = tags.owned.iter().map(|t| t.id).collect();
    let unowned: Vec<TagId> = tags.unowned.iter().map(|t| t.id).collect();
    assert_eq!(owned, vec![f.t1]);
    assert_eq!(unowned, vec![f.t2, extra]);

    let suggestions: Vec<TagId> = f
        .harness
        .engine
        .tag_suggestions(f.notes[0], "T")
        .iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(suggestions, vec![f.t2, extra]);
    assert!(f.harness.engine.tag_suggestions(f.notes[0], "ea").len() == 1);
}
