// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The data store: current snapshot, commit slot and transaction factory.
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing::debug;

use crate::candidate::DataTreeCandidate;
use crate::chain::TransactionChain;
use crate::config::StoreConfig;
use crate::error::ConflictError;
use crate::listener::{DataTreeChangeListener, ListenerRegistration, Notifier};
use crate::path::Path;
use crate::schema::SchemaModel;
use crate::snapshot::Snapshot;
use crate::transaction::{ReadOnlyTransaction, ReadWriteTransaction, WriteOnlyTransaction};
use crate::tx::{TxId, TxIdAllocator, Version};

/// State shared by the store handle, its transactions and cohorts.
pub(crate) struct StoreInner {
    config: StoreConfig,
    schema: Arc<SchemaModel>,
    current: ArcSwap<Snapshot>,
    /// Holder of the single pre-commit slot. The snapshot pointer is only
    /// swapped while this lock is held.
    slot: Mutex<Option<TxId>>,
    tx_ids: TxIdAllocator,
    notifier: Arc<Notifier>,
}

impl StoreInner {
    pub(crate) fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub(crate) fn current(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    pub(crate) fn next_tx(&self) -> TxId {
        self.tx_ids.next()
    }

    /// Claims the pre-commit slot for `tx` if nobody holds it and the store
    /// is still at `base`. Returns the current snapshot.
    pub(crate) fn claim_slot(
        &self,
        tx: TxId,
        base: &Snapshot,
    ) -> Result<Arc<Snapshot>, ConflictError> {
        let mut slot = self.slot.lock();
        if let Some(holder) = *slot {
            if holder != tx {
                return Err(ConflictError::CommitInProgress { holder });
            }
        }
        let current = self.current.load_full();
        if !current.descends_unchanged_from(base) {
            return Err(ConflictError::StaleBase {
                base: base.version(),
                current: current.version(),
            });
        }
        *slot = Some(tx);
        Ok(current)
    }

    pub(crate) fn release_slot(&self, tx: TxId) {
        let mut slot = self.slot.lock();
        if *slot == Some(tx) {
            *slot = None;
        }
    }

    /// Makes `snapshot` current, queues `candidate` for the listeners and
    /// releases the slot.
    ///
    /// The caller must hold the slot; this cannot fail.
    pub(crate) fn publish(
        &self,
        tx: TxId,
        snapshot: Arc<Snapshot>,
        candidate: Arc<DataTreeCandidate>,
    ) {
        let mut slot = self.slot.lock();
        debug_assert_eq!(*slot, Some(tx), "publishing without the commit slot");
        self.current.store(snapshot);
        self.notifier.enqueue(candidate);
        *slot = None;
    }

    /// Delivers queued candidates up to and including `version`.
    pub(crate) fn notify_through(&self, version: Version) {
        self.notifier.deliver_through(version);
    }
}

/// In-process, schema-aware versioned tree store.
///
/// Cloning yields another handle to the same store.
#[derive(Clone)]
pub struct DataStore {
    inner: Arc<StoreInner>,
}

impl DataStore {
    /// Creates an empty store at [`Version::INITIAL`] with the default
    /// configuration.
    #[must_use]
    pub fn new(schema: SchemaModel) -> Self {
        Self::with_config(schema, StoreConfig::default())
    }

    /// Creates an empty store with an explicit configuration.
    #[must_use]
    pub fn with_config(schema: SchemaModel, config: StoreConfig) -> Self {
        let schema = Arc::new(schema);
        let initial = Snapshot::empty(Arc::clone(&schema));
        debug!(store = %config.name, "data store created");
        Self {
            inner: Arc::new(StoreInner {
                config,
                schema,
                current: ArcSwap::from_pointee(initial),
                slot: Mutex::new(None),
                tx_ids: TxIdAllocator::default(),
                notifier: Arc::new(Notifier::default()),
            }),
        }
    }

    /// Store configuration.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Schema the store validates against.
    #[must_use]
    pub fn schema(&self) -> &Arc<SchemaModel> {
        &self.inner.schema
    }

    /// Current committed snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.current()
    }

    /// Current committed version.
    #[must_use]
    pub fn version(&self) -> Version {
        self.inner.current.load().version()
    }

    /// Opens a read-only transaction pinned to the current snapshot.
    #[must_use]
    pub fn new_read_only_transaction(&self) -> ReadOnlyTransaction {
        ReadOnlyTransaction::open(&self.inner, self.inner.current())
    }

    /// Opens a write-only transaction based on the current snapshot.
    #[must_use]
    pub fn new_write_only_transaction(&self) -> WriteOnlyTransaction {
        WriteOnlyTransaction::open(&self.inner, self.inner.current(), None)
    }

    /// Opens a read-write transaction based on the current snapshot.
    #[must_use]
    pub fn new_read_write_transaction(&self) -> ReadWriteTransaction {
        ReadWriteTransaction::open(&self.inner, self.inner.current(), None)
    }

    /// Creates a chain whose transactions build on their predecessor's
    /// readied state.
    #[must_use]
    pub fn create_transaction_chain(&self) -> TransactionChain {
        TransactionChain::new(Arc::clone(&self.inner))
    }

    /// Registers a listener for every commit.
    pub fn register_listener(
        &self,
        listener: impl DataTreeChangeListener + 'static,
    ) -> ListenerRegistration {
        self.register_listener_at(Path::root(), listener)
    }

    /// Registers a listener for commits that touch `path`.
    pub fn register_listener_at(
        &self,
        path: Path,
        listener: impl DataTreeChangeListener + 'static,
    ) -> ListenerRegistration {
        self.inner.notifier.register(path, Arc::new(listener))
    }
}

impl std::fmt::Debug for DataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataStore")
            .field("name", &self.inner.config.name)
            .field("version", &self.version())
            .finish_non_exhaustive()
    }
}
