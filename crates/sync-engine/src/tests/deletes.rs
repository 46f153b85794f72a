//! Deletes are optimistic, idempotent and never resurrect anything.

use super::harness::{Failure, TestHarness};
use crate::{ErrorKind, Intent, SyncStatus};

#[tokio::test]
async fn test_concurrent_deletes_of_same_note() {
    let harness = TestHarness::signed_in().await;
    let section = harness.create_section("s").await;
    let note = harness.create_note(section).await;

    let first = harness.engine.dispatch(Intent::DeleteNote { id: note });
    let second = harness.engine.dispatch(Intent::DeleteNote { id: note });
    first.await.unwrap();
    second.await.unwrap();

    assert!(harness.note(note).is_none());
    assert!(harness.engine.take_errors().is_empty());
    assert_eq!(harness.remote.count("delete_note"), 1);
}

#[tokio::test]
async fn test_sequential_double_delete_is_noop() {
    let harness = TestHarness::guest();
    let section = harness.create_section("s").await;
    let note = harness.create_note(section).await;
    let other = harness.create_note(section).await;

    harness.engine.handle(Intent::DeleteNote { id: note }).await;
    let after_first = harness.engine.snapshot();
    harness.engine.handle(Intent::DeleteNote { id: note }).await;
    let after_second = harness.engine.snapshot();

    assert_eq!(after_first.notes.len(), 1);
    assert_eq!(after_second.notes.len(), 1);
    assert!(after_second.notes.contains(other));
    assert!(harness.engine.take_errors().is_empty());
}

#[tokio::test]
async fn test_server_side_missing_note_is_not_an_error() {
    let harness = TestHarness::signed_in().await;
    let section = harness.create_section("s").await;
    let note = harness.create_note(section).await;

    harness.remote.fail("delete_note", Failure::NotFound);
    harness.engine.handle(Intent::DeleteNote { id: note }).await;

    assert!(harness.note(note).is_none());
    assert!(harness.engine.take_errors().is_empty());
    assert_eq!(harness.engine.status(), SyncStatus::Synced);
}

#[tokio::test]
async fn test_failed_delete_stays_deleted() {
    let harness = TestHarness::signed_in().await;
    let section = harness.create_section("s").await;
    let note = harness.create_note(section).await;
    let tag = harness.create_tag(section, "x", &[note]).await;

    harness.remote.fail("delete_tag", Failure::Timeout);
    harness.engine.handle(Intent::DeleteTag { id: tag }).await;

    assert!(harness.tag(tag).is_none());
    assert!(harness.note(note).unwrap().tag_set.is_empty());
    let errors = harness.engine.take_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].operation, "delete_tag");
    assert_eq!(errors[0].kind, ErrorKind::NetworkFailure);
    assert_eq!(harness.engine.status(), SyncStatus::Offline);
    harness.assert_symmetric();
}

#[tokio::test]
async fn test_section_delete_cascades() {
    let harness = TestHarness::guest();
    let keep = harness.create_section("keep").await;
    let doomed = harness.create_section("doomed").await;
    let kept_note = harness.create_note(keep).await;
    let note = harness.create_note(doomed).await;
    harness.create_tag(doomed, "gone", &[note]).await;
    harness.create_tag(keep, "stays", &[kept_note]).await;
    harness
        .engine
        .handle(Intent::ActivateSection { id: doomed })
        .await;

    harness.engine.handle(Intent::DeleteSection { id: doomed }).await;

    let tree = harness.engine.snapshot();
    assert!(!tree.sections.contains(doomed));
    assert!(tree.notes.sorted_in(doomed).is_empty());
    assert!(tree.tags.sorted_in(doomed).is_empty());
    assert!(tree.filter(doomed).is_none());
    assert_eq!(tree.notes.sorted_in(keep).len(), 1);
    assert_eq!(tree.tags.sorted_in(keep).len(), 1);
    harness.assert_symmetric();
}
