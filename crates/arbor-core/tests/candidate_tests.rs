// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs, clippy::unwrap_used, clippy::panic)]
use arbor_core::{DataNode, DataWrite, ModificationType, Path, Version};
use arbor_dry_tests::schema::{DESCRIPTION, VALUE};
use arbor_dry_tests::{
    commit, commit_delete, commit_write, inner_entry, inner_entry_path, inner_list_path,
    inner_value_path, outer_entry, outer_entry_path, outer_list, outer_list_path, test_container,
    test_path,
};
mod common;
use common::seeded_store;

#[test]
fn candidate_lists_exactly_the_changed_spine() {
    let store = seeded_store();
    let value = inner_value_path(1, "one");
    let mut tx = store.new_write_only_transaction();
    tx.write(&value, DataNode::leaf(VALUE, "x")).unwrap();
    let mut cohort = tx.ready().unwrap();
    commit(&mut cohort).unwrap();

    let candidate = cohort.candidate().unwrap();
    assert_eq!(candidate.before_version(), Version::from_raw(1));
    assert_eq!(candidate.after_version(), Version::from_raw(2));
    assert_eq!(
        candidate.changed_paths(),
        vec![
            Path::root(),
            test_path(),
            outer_list_path(),
            outer_entry_path(1),
            inner_list_path(1),
            inner_entry_path(1, "one"),
            value.clone(),
        ]
    );
    let leaf = candidate.node(&value).unwrap();
    assert_eq!(leaf.modification(), ModificationType::Write);
    assert!(leaf.before().is_some() && leaf.after().is_some());
    assert!(candidate.node(&outer_entry_path(2)).is_none());
    assert!(!candidate.touches(&outer_entry_path(2)));
    assert!(candidate.touches(&outer_entry_path(1)));
}

#[test]
fn unchanged_subtrees_are_shared_and_keep_their_version() {
    let store = seeded_store();
    let before = store.snapshot();
    commit_write(&store, &inner_value_path(1, "one"), DataNode::leaf(VALUE, "x")).unwrap();
    let after = store.snapshot();

    let untouched = outer_entry_path(2);
    assert!(DataNode::ptr_eq(
        &before.read(&untouched).unwrap(),
        &after.read(&untouched).unwrap()
    ));
    assert_eq!(after.version_at(&untouched), Some(Version::from_raw(1)));
    assert_eq!(after.version_at(&outer_entry_path(1)), Some(Version::from_raw(2)));
    assert_eq!(after.version_at(&Path::root()), Some(Version::from_raw(2)));
}

#[test]
fn delete_is_reported_with_its_before_image() {
    let store = seeded_store();
    let listener = arbor_dry_tests::RecordingListener::new();
    let _reg = store.register_listener(listener.clone());
    commit_delete(&store, &outer_entry_path(2)).unwrap();

    let candidates = listener.candidates();
    let node = candidates[0].node(&outer_entry_path(2)).unwrap();
    assert_eq!(node.modification(), ModificationType::Delete);
    assert!(node.after().is_none());
    assert_eq!(node.before(), Some(&outer_entry(2, [inner_entry("two", "b")])));
}

#[test]
fn rewriting_identical_content_changes_nothing() {
    let store = seeded_store();
    let same = test_container([outer_list([
        outer_entry(1, [inner_entry("one", "a")]),
        outer_entry(2, [inner_entry("two", "b")]),
    ])]);
    let mut tx = store.new_write_only_transaction();
    tx.write(&test_path(), same).unwrap();
    let mut cohort = tx.ready().unwrap();
    assert_eq!(commit(&mut cohort).unwrap(), Version::from_raw(2));

    let candidate = cohort.candidate().unwrap();
    assert!(candidate.is_empty());
    assert!(candidate.changed_paths().is_empty());
    assert_eq!(candidate.root().modification(), ModificationType::Unmodified);
    assert_eq!(store.snapshot().version_at(&Path::root()), Some(Version::from_raw(1)));
}

#[test]
fn empty_transaction_still_yields_one_candidate() {
    let store = seeded_store();
    let listener = arbor_dry_tests::RecordingListener::new();
    let _reg = store.register_listener(listener.clone());
    let mut tx = store.new_write_only_transaction();
    commit(&mut tx.ready().unwrap()).unwrap();
    assert_eq!(listener.versions(), vec![Version::from_raw(2)]);
    assert_eq!(listener.last_changed_paths(), Some(Vec::new()));
}

#[test]
fn leaf_overwrite_is_reported_as_write() {
    let store = seeded_store();
    let path = test_path().child(DESCRIPTION);
    commit_write(&store, &path, DataNode::leaf(DESCRIPTION, "first")).unwrap();
    let listener = arbor_dry_tests::RecordingListener::new();
    let _reg = store.register_listener(listener.clone());
    commit_write(&store, &path, DataNode::leaf(DESCRIPTION, "second")).unwrap();

    let candidates = listener.candidates();
    let node = candidates[0].node(&path).unwrap();
    assert_eq!(node.modification(), ModificationType::Write);
    assert_eq!(node.before(), Some(&DataNode::leaf(DESCRIPTION, "first")));
    assert_eq!(node.after(), Some(&DataNode::leaf(DESCRIPTION, "second")));
}
