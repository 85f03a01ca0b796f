// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code)]

use arbor_core::{
    CommitCohort, DataNode, DataRead, DataStore, DataWrite, Path, StoreError, Value, Version,
};
use arbor_dry_tests::{
    commit_write, inner_entry, outer_entry, outer_list, test_container, test_path,
    StoreTestBuilder,
};

/// Store seeded with `/test/outer-list` holding entries 1 (`one=a`) and
/// 2 (`two=b`) at version 1.
pub fn seeded_store() -> DataStore {
    let store = StoreTestBuilder::new()
        .with_name("fixture")
        .build()
        .unwrap();
    commit_write(
        &store,
        &test_path(),
        test_container([outer_list([
            outer_entry(1, [inner_entry("one", "a")]),
            outer_entry(2, [inner_entry("two", "b")]),
        ])]),
    )
    .unwrap();
    store
}

/// Value of the leaf at `path` in the current snapshot.
pub fn value_at(store: &DataStore, path: &Path) -> Option<Value> {
    store
        .snapshot()
        .read(path)
        .and_then(|node| node.value().cloned())
}

/// Value of the leaf at `path` as seen by `reader`.
pub fn read_value<R: DataRead>(reader: &R, path: &Path) -> Option<Value> {
    reader
        .read(path)
        .unwrap()
        .and_then(|node| node.value().cloned())
}

/// Stages one write in a fresh read-write transaction and readies it.
pub fn readied_write(store: &DataStore, path: &Path, node: DataNode) -> CommitCohort {
    let mut tx = store.new_read_write_transaction();
    tx.write(path, node).unwrap();
    tx.ready().unwrap()
}

/// Runs `can_commit` and `pre_commit`, leaving the cohort ready to commit.
pub fn prepare(cohort: &mut CommitCohort) -> Result<(), StoreError> {
    cohort.can_commit()?;
    cohort.pre_commit()
}

/// Writes `node` at `path`, retrying on conflicts until it commits.
pub fn commit_with_retry(store: &DataStore, path: &Path, node: &DataNode) -> Version {
    loop {
        let mut tx = store.new_write_only_transaction();
        tx.write(path, node.clone()).unwrap();
        let mut cohort = tx.ready().unwrap();
        match arbor_dry_tests::commit(&mut cohort) {
            Ok(version) => return version,
            Err(StoreError::Conflict(_)) => std::thread::yield_now(),
            Err(err) => panic!("unexpected commit failure: {err}"),
        }
    }
}
