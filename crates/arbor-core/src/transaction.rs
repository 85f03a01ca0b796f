// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Transaction handles and the read/write traits they implement.
use std::sync::Arc;

use tracing::{debug, trace};

use crate::chain::{self, ChainShared};
use crate::cohort::CommitCohort;
use crate::error::{IllegalStateError, StoreError};
use crate::node::DataNode;
use crate::overlay::{Modification, Overlay};
use crate::path::Path;
use crate::snapshot::Snapshot;
use crate::store::StoreInner;
use crate::tx::{TxId, Version};

/// Read access to one consistent view of the tree.
pub trait DataRead {
    /// Reads the node at `path`; `Ok(None)` when absent.
    ///
    /// # Errors
    /// Returns [`IllegalStateError`] when the handle was closed, aborted or
    /// readied.
    fn read(&self, path: &Path) -> Result<Option<DataNode>, StoreError>;

    /// Returns `true` when a node exists at `path`.
    ///
    /// # Errors
    /// Same as [`DataRead::read`].
    fn exists(&self, path: &Path) -> Result<bool, StoreError> {
        Ok(self.read(path)?.is_some())
    }
}

/// Staging access for write-capable transactions.
pub trait DataWrite {
    /// Replaces the subtree at `path` with `node`.
    ///
    /// # Errors
    /// [`ValidationError`](crate::ValidationError) when the schema rejects
    /// the node's position or shape; [`IllegalStateError`] after `ready` or
    /// `abort`.
    fn write(&mut self, path: &Path, node: DataNode) -> Result<(), StoreError>;

    /// Merges `node` into the subtree at `path`.
    ///
    /// # Errors
    /// Same as [`DataWrite::write`], plus choice case errors from the merge.
    fn merge(&mut self, path: &Path, node: DataNode) -> Result<(), StoreError>;

    /// Removes the subtree at `path`; a no-op when absent.
    ///
    /// # Errors
    /// Same as [`DataWrite::write`].
    fn delete(&mut self, path: &Path) -> Result<(), StoreError>;

    /// Freezes the staged changes and hands them to a commit cohort.
    ///
    /// # Errors
    /// [`IllegalStateError::TransactionReady`] when called twice,
    /// [`IllegalStateError::TransactionClosed`] after `abort`.
    fn ready(&mut self) -> Result<CommitCohort, StoreError>;

    /// Discards the staged changes. Idempotent.
    fn abort(&mut self);
}

/// Read-only transaction pinned to the snapshot current when it opened.
#[derive(Debug)]
pub struct ReadOnlyTransaction {
    id: TxId,
    snapshot: Option<Arc<Snapshot>>,
}

impl ReadOnlyTransaction {
    pub(crate) fn open(store: &StoreInner, snapshot: Arc<Snapshot>) -> Self {
        let id = store.next_tx();
        debug!(tx = %id, mode = "read-only", base = %snapshot.version(), "transaction opened");
        Self {
            id,
            snapshot: Some(snapshot),
        }
    }

    /// Transaction identifier.
    #[must_use]
    pub fn id(&self) -> TxId {
        self.id
    }

    /// Version of the pinned snapshot; `None` once closed.
    #[must_use]
    pub fn version(&self) -> Option<Version> {
        self.snapshot.as_ref().map(|s| s.version())
    }

    /// Releases the pinned snapshot; later reads fail.
    pub fn close(&mut self) {
        if self.snapshot.take().is_some() {
            debug!(tx = %self.id, "transaction closed");
        }
    }
}

impl DataRead for ReadOnlyTransaction {
    fn read(&self, path: &Path) -> Result<Option<DataNode>, StoreError> {
        let snapshot = self
            .snapshot
            .as_ref()
            .ok_or(IllegalStateError::TransactionClosed { tx: self.id })?;
        Ok(snapshot.read(path))
    }
}

enum Staging {
    Open(Overlay),
    Readied,
    Aborted,
}

/// Shared machinery of the write-capable handles.
struct StagingArea {
    id: TxId,
    store: Arc<StoreInner>,
    state: Staging,
    chain: Option<Arc<ChainShared>>,
}

impl StagingArea {
    fn open(
        store: &Arc<StoreInner>,
        base: Arc<Snapshot>,
        chain: Option<Arc<ChainShared>>,
        id: Option<TxId>,
        mode: &'static str,
    ) -> Self {
        let id = id.unwrap_or_else(|| store.next_tx());
        debug!(tx = %id, mode, base = %base.version(), chained = chain.is_some(), "transaction opened");
        Self {
            id,
            store: Arc::clone(store),
            state: Staging::Open(Overlay::new(base)),
            chain,
        }
    }

    fn overlay(&self) -> Result<&Overlay, IllegalStateError> {
        match &self.state {
            Staging::Open(overlay) => Ok(overlay),
            Staging::Readied => Err(IllegalStateError::TransactionReady { tx: self.id }),
            Staging::Aborted => Err(IllegalStateError::TransactionClosed { tx: self.id }),
        }
    }

    fn stage(&mut self, path: &Path, op: Modification) -> Result<(), StoreError> {
        let id = self.id;
        let trace_ops = self.store.config().debug_transactions;
        let overlay = match &mut self.state {
            Staging::Open(overlay) => overlay,
            Staging::Readied => return Err(IllegalStateError::TransactionReady { tx: id }.into()),
            Staging::Aborted => return Err(IllegalStateError::TransactionClosed { tx: id }.into()),
        };
        if trace_ops {
            trace!(tx = %id, op = op.label(), %path, "staging operation");
        }
        match op {
            Modification::Write(node) => overlay.write(path, node)?,
            Modification::Merge(node) => overlay.merge(path, node)?,
            Modification::Delete => overlay.delete(path)?,
        }
        Ok(())
    }

    fn ready(&mut self) -> Result<CommitCohort, StoreError> {
        let overlay = match std::mem::replace(&mut self.state, Staging::Readied) {
            Staging::Open(overlay) => overlay,
            Staging::Readied => {
                return Err(IllegalStateError::TransactionReady { tx: self.id }.into());
            }
            Staging::Aborted => {
                self.state = Staging::Aborted;
                return Err(IllegalStateError::TransactionClosed { tx: self.id }.into());
            }
        };
        debug!(
            tx = %self.id,
            base = %overlay.base_version(),
            operations = overlay.operations().count(),
            "transaction ready"
        );
        if let Some(chain) = &self.chain {
            chain.on_ready(chain::speculate(self.id, &overlay));
        }
        Ok(CommitCohort::new(
            self.id,
            Arc::clone(&self.store),
            overlay,
            self.chain.clone(),
        ))
    }

    fn abort(&mut self) {
        if let Staging::Open(_) = self.state {
            debug!(tx = %self.id, "transaction aborted");
            if let Some(chain) = &self.chain {
                chain.on_abandoned(self.id);
            }
        }
        if !matches!(self.state, Staging::Readied) {
            self.state = Staging::Aborted;
        }
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        if let (Staging::Open(_), Some(chain)) = (&self.state, &self.chain) {
            chain.on_abandoned(self.id);
        }
    }
}

/// Transaction that stages changes without reading them back.
pub struct WriteOnlyTransaction {
    area: StagingArea,
}

impl WriteOnlyTransaction {
    pub(crate) fn open(
        store: &Arc<StoreInner>,
        base: Arc<Snapshot>,
        chained: Option<(Arc<ChainShared>, TxId)>,
    ) -> Self {
        let (chain, id) = chained.map_or((None, None), |(c, id)| (Some(c), Some(id)));
        Self {
            area: StagingArea::open(store, base, chain, id, "write-only"),
        }
    }

    /// Transaction identifier.
    #[must_use]
    pub fn id(&self) -> TxId {
        self.area.id
    }
}

/// Transaction that reads its own staged changes on top of its base
/// snapshot.
pub struct ReadWriteTransaction {
    area: StagingArea,
}

impl ReadWriteTransaction {
    pub(crate) fn open(
        store: &Arc<StoreInner>,
        base: Arc<Snapshot>,
        chained: Option<(Arc<ChainShared>, TxId)>,
    ) -> Self {
        let (chain, id) = chained.map_or((None, None), |(c, id)| (Some(c), Some(id)));
        Self {
            area: StagingArea::open(store, base, chain, id, "read-write"),
        }
    }

    /// Transaction identifier.
    #[must_use]
    pub fn id(&self) -> TxId {
        self.area.id
    }

    /// Version of the snapshot this transaction is based on.
    ///
    /// # Errors
    /// [`IllegalStateError`] after `ready` or `abort`.
    pub fn base_version(&self) -> Result<Version, StoreError> {
        Ok(self.area.overlay()?.base_version())
    }
}

impl DataRead for ReadWriteTransaction {
    fn read(&self, path: &Path) -> Result<Option<DataNode>, StoreError> {
        Ok(self.area.overlay()?.read(path))
    }
}

macro_rules! impl_data_write {
    ($ty:ty) => {
        impl DataWrite for $ty {
            fn write(&mut self, path: &Path, node: DataNode) -> Result<(), StoreError> {
                self.area.stage(path, Modification::Write(node))
            }

            fn merge(&mut self, path: &Path, node: DataNode) -> Result<(), StoreError> {
                self.area.stage(path, Modification::Merge(node))
            }

            fn delete(&mut self, path: &Path) -> Result<(), StoreError> {
                self.area.stage(path, Modification::Delete)
            }

            fn ready(&mut self) -> Result<CommitCohort, StoreError> {
                self.area.ready()
            }

            fn abort(&mut self) {
                self.area.abort();
            }
        }

        impl std::fmt::Debug for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let state = match self.area.state {
                    Staging::Open(_) => "open",
                    Staging::Readied => "readied",
                    Staging::Aborted => "aborted",
                };
                f.debug_struct(stringify!($ty))
                    .field("id", &self.area.id)
                    .field("state", &state)
                    .finish()
            }
        }
    };
}

impl_data_write!(WriteOnlyTransaction);
impl_data_write!(ReadWriteTransaction);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::schema::{SchemaModel, SchemaNode};
    use crate::store::DataStore;

    fn store() -> DataStore {
        DataStore::new(SchemaModel::new([SchemaNode::container(
            "test",
            [SchemaNode::leaf("value")],
        )]))
    }

    fn test_path() -> Path {
        Path::root().child("test")
    }

    #[test]
    fn read_after_close_is_illegal_state() {
        let store = store();
        let mut tx = store.new_read_only_transaction();
        assert!(matches!(tx.read(&test_path()), Ok(None)));
        tx.close();
        assert!(matches!(
            tx.read(&test_path()),
            Err(StoreError::IllegalState(IllegalStateError::TransactionClosed { .. }))
        ));
    }

    #[test]
    fn write_after_ready_is_illegal_state() {
        let store = store();
        let mut tx = store.new_read_write_transaction();
        assert!(tx.ready().is_ok());
        let res = tx.write(&test_path(), DataNode::container("test", []));
        assert!(
            matches!(
                res,
                Err(StoreError::IllegalState(IllegalStateError::TransactionReady { .. }))
            ),
            "got {res:?}"
        );
        assert!(matches!(tx.read(&test_path()), Err(StoreError::IllegalState(_))));
    }

    #[test]
    fn ready_twice_is_illegal_state() {
        let store = store();
        let mut tx = store.new_write_only_transaction();
        assert!(tx.ready().is_ok());
        assert!(matches!(
            tx.ready(),
            Err(StoreError::IllegalState(IllegalStateError::TransactionReady { .. }))
        ));
    }

    #[test]
    fn ready_after_abort_reports_closed() {
        let store = store();
        let mut tx = store.new_write_only_transaction();
        tx.abort();
        tx.abort();
        assert!(matches!(
            tx.ready(),
            Err(StoreError::IllegalState(IllegalStateError::TransactionClosed { .. }))
        ));
    }

    #[test]
    fn validation_errors_surface_through_store_error() {
        let store = store();
        let mut tx = store.new_read_write_transaction();
        let res = tx.write(&Path::root().child("nope"), DataNode::container("nope", []));
        assert!(matches!(
            res,
            Err(StoreError::Validation(ValidationError::UnknownSchemaNode { .. }))
        ));
    }

    #[test]
    fn transaction_ids_are_distinct() {
        let store = store();
        let a = store.new_read_only_transaction();
        let b = store.new_write_only_transaction();
        assert_ne!(a.id(), b.id());
    }
}
