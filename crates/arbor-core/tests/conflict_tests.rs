// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs, clippy::unwrap_used, clippy::panic)]
use std::thread;

use arbor_core::{
    CohortState, ConflictError, DataNode, DataWrite, StoreError, ValidationError, Value, Version,
};
use arbor_dry_tests::schema::{ID, OUTER_LIST, VALUE};
use arbor_dry_tests::{inner_value_path, outer_entry, outer_entry_path, test_path, RecordingListener};
mod common;
use common::{commit_with_retry, prepare, readied_write, seeded_store, value_at};

#[test]
fn second_cohort_on_same_base_sees_stale_base() {
    let store = seeded_store();
    let mut first = readied_write(&store, &inner_value_path(1, "one"), DataNode::leaf(VALUE, "x"));
    let mut second = readied_write(&store, &inner_value_path(2, "two"), DataNode::leaf(VALUE, "y"));

    prepare(&mut first).unwrap();
    assert_eq!(first.commit().unwrap(), Version::from_raw(2));

    let res = second.can_commit();
    assert!(
        matches!(
            res,
            Err(StoreError::Conflict(ConflictError::StaleBase { base, current }))
                if base == Version::from_raw(1) && current == Version::from_raw(2)
        ),
        "got {res:?}"
    );
    assert_eq!(second.state(), CohortState::Readied);
    second.abort().unwrap();
    assert_eq!(value_at(&store, &inner_value_path(2, "two")), Some(Value::from("b")));
}

#[test]
fn pre_commit_slot_is_exclusive_and_fails_fast() {
    let store = seeded_store();
    let mut first = readied_write(&store, &inner_value_path(1, "one"), DataNode::leaf(VALUE, "x"));
    let mut second = readied_write(&store, &inner_value_path(2, "two"), DataNode::leaf(VALUE, "y"));

    prepare(&mut first).unwrap();
    second.can_commit().unwrap();
    let res = second.pre_commit();
    assert!(
        matches!(
            res,
            Err(StoreError::Conflict(ConflictError::CommitInProgress { holder })) if holder == first.tx()
        ),
        "got {res:?}"
    );
    first.commit().unwrap();
    second.abort().unwrap();

    let mut retry = readied_write(&store, &inner_value_path(2, "two"), DataNode::leaf(VALUE, "y"));
    prepare(&mut retry).unwrap();
    assert_eq!(retry.commit().unwrap(), Version::from_raw(3));
}

#[test]
fn aborted_commit_leaves_state_root_unchanged() {
    let store = seeded_store();
    let before = store.snapshot().state_root_hex();
    let mut cohort = readied_write(&store, &test_path(), DataNode::container("test", []));
    prepare(&mut cohort).unwrap();
    assert!(cohort.candidate().is_some_and(|c| !c.is_empty()));
    cohort.abort().unwrap();
    assert_eq!(store.snapshot().state_root_hex(), before);
    assert_eq!(store.version(), Version::from_raw(1));
}

#[test]
fn validation_errors_surface_at_can_commit() {
    let store = seeded_store();
    let bad_key = DataNode::list_entry(OUTER_LIST, [(ID, 3)], [DataNode::leaf(ID, 9)]);
    let mut cohort = readied_write(&store, &outer_entry_path(3), bad_key);
    let res = cohort.can_commit();
    assert!(
        matches!(res, Err(StoreError::Validation(ValidationError::KeyMismatch { .. }))),
        "got {res:?}"
    );
    cohort.abort().unwrap();
    assert_eq!(store.version(), Version::from_raw(1));
}

#[test]
fn shape_errors_surface_at_write() {
    let store = seeded_store();
    let mut tx = store.new_write_only_transaction();
    assert!(matches!(
        tx.write(&test_path().child("bogus"), DataNode::leaf("bogus", 1)),
        Err(StoreError::Validation(ValidationError::UnknownSchemaNode { .. }))
    ));
    assert!(matches!(
        tx.write(&test_path(), DataNode::leaf("test", 1)),
        Err(StoreError::Validation(ValidationError::KindMismatch { .. }))
    ));
    assert!(matches!(
        tx.write(&outer_entry_path(4), outer_entry(5, [])),
        Err(StoreError::Validation(ValidationError::IdentifierMismatch { .. }))
    ));
}

#[test]
fn concurrent_writers_serialize_into_consecutive_versions() {
    const WRITERS: i64 = 8;
    let store = seeded_store();
    let listener = RecordingListener::new();
    let _registration = store.register_listener(listener.clone());

    let handles: Vec<_> = (10..10 + WRITERS)
        .map(|id| {
            let store = store.clone();
            thread::spawn(move || {
                commit_with_retry(&store, &outer_entry_path(id), &outer_entry(id, []))
            })
        })
        .collect();
    let mut versions: Vec<Version> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    versions.sort();

    let expected: Vec<Version> = (2..10).map(Version::from_raw).collect();
    assert_eq!(versions, expected);
    assert_eq!(listener.versions(), expected, "delivery must follow commit order");
    let snapshot = store.snapshot();
    for id in 10..10 + WRITERS {
        assert!(snapshot.read(&outer_entry_path(id)).is_some(), "entry {id} lost");
    }
}
