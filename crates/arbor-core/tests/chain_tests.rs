// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs, clippy::unwrap_used, clippy::panic)]
use arbor_core::{
    ConflictError, DataNode, DataRead, DataWrite, IllegalStateError, StoreError, Value, Version,
};
use arbor_dry_tests::schema::{DESCRIPTION, VALUE};
use arbor_dry_tests::{
    commit, commit_write, inner_value_path, outer_entry, outer_entry_path, outer_list,
    outer_list_path, test_container, test_path, RecordingListener, StoreTestBuilder,
};
mod common;
use common::{prepare, value_at};

#[test]
fn chained_transactions_build_on_readied_predecessors() {
    let store = StoreTestBuilder::new().build().unwrap();
    let listener = RecordingListener::new();
    let _reg = store.register_listener(listener.clone());
    let chain = store.create_transaction_chain();

    let mut tx1 = chain.new_write_only_transaction().unwrap();
    tx1.write(&test_path(), test_container([])).unwrap();
    let mut first = tx1.ready().unwrap();

    let mut tx2 = chain.new_read_write_transaction().unwrap();
    assert_eq!(tx2.base_version().unwrap(), Version::from_raw(1));
    assert!(tx2.exists(&test_path()).unwrap());
    tx2.write(&outer_list_path(), outer_list([outer_entry(1, [])]))
        .unwrap();
    let mut second = tx2.ready().unwrap();

    let mut tx3 = chain.new_write_only_transaction().unwrap();
    tx3.write(&inner_value_path(1, "one"), DataNode::leaf(VALUE, "deep"))
        .unwrap();
    let mut third = tx3.ready().unwrap();

    // Successors cannot commit ahead of their predecessor.
    assert!(matches!(
        second.can_commit(),
        Err(StoreError::Conflict(ConflictError::StaleBase { .. }))
    ));

    for cohort in [&mut first, &mut second, &mut third] {
        prepare(cohort).unwrap();
        cohort.commit().unwrap();
    }
    assert_eq!(store.version(), Version::from_raw(3));
    assert_eq!(
        value_at(&store, &inner_value_path(1, "one")),
        Some(Value::from("deep"))
    );
    assert_eq!(
        listener.versions(),
        (1..4).map(Version::from_raw).collect::<Vec<_>>()
    );

    // Once everything committed the chain reads the store again.
    let reader = chain.new_read_only_transaction().unwrap();
    assert_eq!(reader.version(), Some(Version::from_raw(3)));
}

#[test]
fn outside_commit_invalidates_the_whole_chain_suffix() {
    let store = StoreTestBuilder::new().build().unwrap();
    let chain = store.create_transaction_chain();

    let mut tx1 = chain.new_write_only_transaction().unwrap();
    tx1.write(&test_path(), test_container([])).unwrap();
    let mut first = tx1.ready().unwrap();
    let mut tx2 = chain.new_write_only_transaction().unwrap();
    tx2.write(&test_path().child(DESCRIPTION), DataNode::leaf(DESCRIPTION, "x"))
        .unwrap();
    let mut second = tx2.ready().unwrap();

    // Same resulting version number, different producer.
    commit_write(&store, &test_path(), test_container([])).unwrap();
    assert_eq!(store.version(), Version::from_raw(1));

    assert!(matches!(
        first.can_commit(),
        Err(StoreError::Conflict(ConflictError::StaleBase { .. }))
    ));
    assert!(matches!(
        second.can_commit(),
        Err(StoreError::Conflict(ConflictError::StaleBase { .. }))
    ));
    first.abort().unwrap();
    assert!(chain.is_failed());
    second.abort().unwrap();
}

#[test]
fn chain_allows_one_open_transaction_at_a_time() {
    let store = StoreTestBuilder::new().build().unwrap();
    let chain = store.create_transaction_chain();
    let mut open = chain.new_write_only_transaction().unwrap();
    assert!(matches!(
        chain.new_write_only_transaction(),
        Err(StoreError::IllegalState(IllegalStateError::ChainBusy { tx })) if tx == open.id()
    ));
    // Readers never occupy the slot.
    assert!(chain.new_read_only_transaction().is_ok());

    open.abort();
    assert!(chain.new_write_only_transaction().is_ok());
    assert!(!chain.is_failed(), "abandoning an open transaction is not a failure");
}

#[test]
fn dropped_cohort_fails_the_chain() {
    let store = StoreTestBuilder::new().build().unwrap();
    let chain = store.create_transaction_chain();
    {
        let mut tx = chain.new_write_only_transaction().unwrap();
        tx.write(&test_path(), test_container([])).unwrap();
        let _cohort = tx.ready().unwrap();
    }
    assert!(chain.is_failed());
    assert!(matches!(
        chain.new_read_write_transaction(),
        Err(StoreError::IllegalState(IllegalStateError::ChainFailed))
    ));
    assert_eq!(store.version(), Version::INITIAL);
}

#[test]
fn closed_chain_still_commits_readied_work() {
    let store = StoreTestBuilder::new().build().unwrap();
    let chain = store.create_transaction_chain();
    let mut tx = chain.new_write_only_transaction().unwrap();
    tx.write(&outer_entry_path(7), outer_entry(7, [])).unwrap();
    let mut cohort = tx.ready().unwrap();
    chain.close();
    assert!(matches!(
        chain.new_write_only_transaction(),
        Err(StoreError::IllegalState(IllegalStateError::ChainClosed))
    ));
    commit(&mut cohort).unwrap();
    assert!(store.snapshot().read(&outer_entry_path(7)).is_some());
}
