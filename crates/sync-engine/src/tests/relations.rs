//! Tag/note membership stays symmetric through every relation-changing
//! intent, in guest and authenticated mode.

use super::harness::{Failure, TestHarness};
use crate::{ErrorKind, Intent, SyncStatus};
use entity_store::{NoteId, TagId};

fn tag_notes(harness: &TestHarness, tag: TagId) -> Vec<NoteId> {
    harness.tag(tag).unwrap().notes
}

fn note_tags(harness: &TestHarness, note: NoteId) -> Vec<TagId> {
    harness.note(note).unwrap().tag_set
}

async fn run_relation_sequence(harness: &TestHarness) {
    let section = harness.create_section("work").await;
    let n1 = harness.create_note(section).await;
    let n2 = harness.create_note(section).await;
    let n3 = harness.create_note(section).await;

    let a = harness.create_tag(section, "Alpha", &[n1, n2]).await;
    harness.assert_symmetric();
    assert_eq!(tag_notes(harness, a), vec![n1, n2]);
    assert_eq!(note_tags(harness, n1), vec![a]);
    assert_eq!(harness.tag(a).unwrap().label, "alpha");

    harness
        .engine
        .handle(Intent::AddTagByLabel {
            note: n3,
            label: "beta".into(),
        })
        .await;
    let b = harness.tag_by_label(section, "beta").unwrap();
    harness.assert_symmetric();
    assert_eq!(tag_notes(harness, b), vec![n3]);

    harness.engine.handle(Intent::AddTagToNote { note: n3, tag: a }).await;
    harness.assert_symmetric();
    assert_eq!(note_tags(harness, n3), vec![b, a]);

    harness
        .engine
        .handle(Intent::RemoveTagFromNote { note: n1, tag: a })
        .await;
    harness.assert_symmetric();
    assert!(note_tags(harness, n1).is_empty());
    assert_eq!(tag_notes(harness, a), vec![n2, n3]);

    harness.engine.handle(Intent::DeleteNote { id: n2 }).await;
    harness.assert_symmetric();
    assert_eq!(tag_notes(harness, a), vec![n3]);

    harness.engine.handle(Intent::DeleteTag { id: b }).await;
    harness.assert_symmetric();
    assert_eq!(note_tags(harness, n3), vec![a]);

    assert!(harness.engine.take_errors().is_empty());
}

#[tokio::test]
async fn test_relations_stay_symmetric_in_guest_mode() {
    let harness = TestHarness::guest();
    run_relation_sequence(&harness).await;
    assert!(harness.remote.calls().is_empty());
}

#[tokio::test]
async fn test_relations_stay_symmetric_when_signed_in() {
    let harness = TestHarness::signed_in().await;
    run_relation_sequence(&harness).await;

    // add-by-label created one tag, the rest were structural updates
    assert_eq!(harness.remote.count("create_tag"), 2);
    assert_eq!(harness.remote.count("update_note"), 2);
}

#[tokio::test]
async fn test_add_by_label_reuses_existing_tag() {
    let harness = TestHarness::guest();
    let section = harness.create_section("s").await;
    let n1 = harness.create_note(section).await;
    let n2 = harness.create_note(section).await;
    let tag = harness.create_tag(section, "rust", &[n1]).await;

    harness
        .engine
        .handle(Intent::AddTagByLabel {
            note: n2,
            label: "  RUST ".into(),
        })
        .await;
    assert_eq!(tag_notes(&harness, tag), vec![n1, n2]);
    assert_eq!(harness.engine.snapshot().tags.len(), 1);

    // Already carried: nothing changes
    harness
        .engine
        .handle(Intent::AddTagByLabel {
            note: n2,
            label: "rust".into(),
        })
        .await;
    assert_eq!(tag_notes(&harness, tag), vec![n1, n2]);
    harness.assert_symmetric();
}

#[tokio::test]
async fn test_duplicate_label_is_rejected() {
    let harness = TestHarness::guest();
    let section = harness.create_section("s").await;
    harness.create_tag(section, "rust", &[]).await;

    harness
        .engine
        .handle(Intent::CreateTag {
            section,
            label: "Rust".into(),
            notes: vec![],
        })
        .await;

    let errors = harness.engine.take_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].operation, "create_tag");
    assert_eq!(errors[0].kind, ErrorKind::Validation);
    assert_eq!(harness.engine.snapshot().tags.len(), 1);
}

#[tokio::test]
async fn test_tag_across_sections_is_rejected() {
    let harness = TestHarness::guest();
    let s1 = harness.create_section("one").await;
    let s2 = harness.create_section("two").await;
    let note = harness.create_note(s1).await;
    let tag = harness.create_tag(s2, "elsewhere", &[]).await;

    harness.engine.handle(Intent::AddTagToNote { note, tag }).await;

    assert_eq!(harness.engine.take_errors()[0].kind, ErrorKind::Validation);
    assert!(note_tags(&harness, note).is_empty());
    harness.assert_symmetric();
}

#[tokio::test]
async fn test_failed_structural_update_changes_neither_side() {
    let harness = TestHarness::signed_in().await;
    let section = harness.create_section("s").await;
    let note = harness.create_note(section).await;
    let tag = harness.create_tag(section, "todo", &[]).await;

    harness.remote.fail("update_note", Failure::Timeout);
    harness.engine.handle(Intent::AddTagToNote { note, tag }).await;

    let errors = harness.engine.take_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].operation, "add_tag_to_note");
    assert_eq!(errors[0].kind, ErrorKind::NetworkFailure);
    assert_eq!(harness.engine.status(), SyncStatus::Offline);
    assert!(note_tags(&harness, note).is_empty());
    assert!(tag_notes(&harness, tag).is_empty());
}

#[tokio::test]
async fn test_concurrent_structural_updates_are_all_applied() {
    let harness = TestHarness::signed_in().await;
    let section = harness.create_section("s").await;
    let note = harness.create_note(section).await;
    let a = harness.create_tag(section, "a", &[]).await;
    let b = harness.create_tag(section, "b", &[]).await;

    let first = harness.engine.dispatch(Intent::AddTagToNote { note, tag: a });
    let second = harness.engine.dispatch(Intent::AddTagToNote { note, tag: b });
    first.await.unwrap();
    second.await.unwrap();

    assert_eq!(note_tags(&harness, note), vec![a, b]);
    let sent: Vec<_> = harness
        .remote
        .note_updates()
        .into_iter()
        .map(|(_, patch)| patch.tag_set.unwrap())
        .collect();
    assert_eq!(sent, vec![vec![a], vec![a, b]]);
    harness.assert_symmetric();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_add_by_same_label_shares_one_tag() {
    let harness = TestHarness::signed_in().await;
    let section = harness.create_section("s").await;
    let a = harness.create_note(section).await;
    let b = harness.create_note(section).await;

    let first = harness.engine.dispatch(Intent::AddTagByLabel {
        note: a,
        label: "Rust".into(),
    });
    let second = harness.engine.dispatch(Intent::AddTagByLabel {
        note: b,
        label: "rust".into(),
    });
    first.await.unwrap();
    second.await.unwrap();

    let labels: Vec<String> = harness
        .engine
        .snapshot()
        .tags
        .sorted_in(section)
        .into_iter()
        .map(|tag| tag.label.clone())
        .collect();
    assert_eq!(labels, vec!["rust".to_string()]);
    assert_eq!(harness.remote.count("create_tag"), 1);

    let tag = harness.tag_by_label(section, "rust").unwrap();
    let mut members = tag_notes(&harness, tag);
    members.sort();
    assert_eq!(members, vec![a, b]);
    assert_eq!(note_tags(&harness, a), vec![tag]);
    assert_eq!(note_tags(&harness, b), vec![tag]);
    assert!(harness.engine.take_errors().is_empty());
    harness.assert_symmetric();
}
