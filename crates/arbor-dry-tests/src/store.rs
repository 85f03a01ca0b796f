// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Store builder and one-call commit helpers.

use arbor_core::{
    CommitCohort, DataNode, DataStore, DataWrite, Path, SchemaModel, StoreConfig, StoreError,
    Version,
};

use crate::schema::test_schema;

/// Builder for test stores, optionally seeded with committed data.
///
/// # Example
///
/// ```
/// use arbor_dry_tests::{test_container, test_path, StoreTestBuilder};
///
/// let store = StoreTestBuilder::new()
///     .with_name("fixture")
///     .with_data(test_path(), test_container([]))
///     .build()
///     .unwrap();
/// assert_eq!(store.version().value(), 1);
/// ```
pub struct StoreTestBuilder {
    schema: SchemaModel,
    config: StoreConfig,
    seed: Vec<(Path, DataNode)>,
}

impl Default for StoreTestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreTestBuilder {
    /// Builder over the canonical test schema with default config.
    pub fn new() -> Self {
        Self {
            schema: test_schema(),
            config: StoreConfig::default(),
            seed: Vec::new(),
        }
    }

    /// Use another schema.
    pub fn with_schema(mut self, schema: SchemaModel) -> Self {
        self.schema = schema;
        self
    }

    /// Set the store name.
    pub fn with_name(mut self, name: &str) -> Self {
        self.config.name = name.to_owned();
        self
    }

    /// Trace every staged operation.
    pub fn with_debug_transactions(mut self) -> Self {
        self.config.debug_transactions = true;
        self
    }

    /// Commit `node` at `path` when the store is built; one commit per call.
    pub fn with_data(mut self, path: Path, node: DataNode) -> Self {
        self.seed.push((path, node));
        self
    }

    /// Build the store and commit the seed data in order.
    pub fn build(self) -> Result<DataStore, StoreError> {
        let store = DataStore::with_config(self.schema, self.config);
        for (path, node) in self.seed {
            commit_write(&store, &path, node)?;
        }
        Ok(store)
    }
}

/// Runs `can_commit`, `pre_commit` and `commit`, aborting the cohort when a
/// phase fails.
pub fn commit(cohort: &mut CommitCohort) -> Result<Version, StoreError> {
    let res = cohort
        .can_commit()
        .and_then(|()| cohort.pre_commit())
        .and_then(|()| cohort.commit());
    if res.is_err() {
        cohort.abort()?;
    }
    res
}

/// Writes `node` at `path` in a fresh write-only transaction and commits it.
pub fn commit_write(store: &DataStore, path: &Path, node: DataNode) -> Result<Version, StoreError> {
    let mut tx = store.new_write_only_transaction();
    tx.write(path, node)?;
    commit(&mut tx.ready()?)
}

/// Merges `node` at `path` in a fresh write-only transaction and commits it.
pub fn commit_merge(store: &DataStore, path: &Path, node: DataNode) -> Result<Version, StoreError> {
    let mut tx = store.new_write_only_transaction();
    tx.merge(path, node)?;
    commit(&mut tx.ready()?)
}

/// Deletes `path` in a fresh write-only transaction and commits it.
pub fn commit_delete(store: &DataStore, path: &Path) -> Result<Version, StoreError> {
    let mut tx = store.new_write_only_transaction();
    tx.delete(path)?;
    commit(&mut tx.ready()?)
}
