// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Transaction chains: sequences of transactions where each one builds on
//! its predecessor's readied, not yet committed, state.
//!
//! When a chained transaction is readied the chain keeps a speculative
//! snapshot of its result (base version + 1, attributed to that
//! transaction). The next chained transaction is based on it and passes
//! `can_commit` once the predecessor's commit has made the same state
//! current.
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::candidate::build_commit;
use crate::error::{IllegalStateError, StoreError};
use crate::overlay::Overlay;
use crate::snapshot::Snapshot;
use crate::store::StoreInner;
use crate::transaction::{ReadOnlyTransaction, ReadWriteTransaction, WriteOnlyTransaction};
use crate::tx::TxId;

#[derive(Debug, Default)]
struct ChainState {
    open: Option<TxId>,
    speculative: Option<Arc<Snapshot>>,
    failed: bool,
    closed: bool,
}

/// Chain bookkeeping shared with the chain's transactions and cohorts.
#[derive(Debug, Default)]
pub(crate) struct ChainShared {
    state: Mutex<ChainState>,
}

impl ChainShared {
    fn usable(state: &ChainState) -> Result<(), IllegalStateError> {
        if state.closed {
            return Err(IllegalStateError::ChainClosed);
        }
        if state.failed {
            return Err(IllegalStateError::ChainFailed);
        }
        Ok(())
    }

    fn base(state: &ChainState, store: &StoreInner) -> Arc<Snapshot> {
        state
            .speculative
            .clone()
            .unwrap_or_else(|| store.current())
    }

    /// Reserves the chain's single open slot for `tx`.
    fn allocate(&self, store: &StoreInner, tx: TxId) -> Result<Arc<Snapshot>, IllegalStateError> {
        let mut state = self.state.lock();
        Self::usable(&state)?;
        if let Some(open) = state.open {
            return Err(IllegalStateError::ChainBusy { tx: open });
        }
        state.open = Some(tx);
        Ok(Self::base(&state, store))
    }

    fn read_base(&self, store: &StoreInner) -> Result<Arc<Snapshot>, IllegalStateError> {
        let state = self.state.lock();
        Self::usable(&state)?;
        Ok(Self::base(&state, store))
    }

    pub(crate) fn on_ready(&self, speculative: Arc<Snapshot>) {
        let mut state = self.state.lock();
        if state.open == speculative.tx() {
            state.open = None;
        }
        state.speculative = Some(speculative);
    }

    /// The open transaction was aborted or dropped before `ready`.
    pub(crate) fn on_abandoned(&self, tx: TxId) {
        let mut state = self.state.lock();
        if state.open == Some(tx) {
            state.open = None;
        }
    }

    pub(crate) fn on_committed(&self, tx: TxId) {
        let mut state = self.state.lock();
        if state.speculative.as_ref().and_then(|s| s.tx()) == Some(tx) {
            state.speculative = None;
        }
    }

    /// A readied transaction will never commit; its successors cannot either.
    pub(crate) fn on_failed(&self, tx: TxId) {
        let mut state = self.state.lock();
        if !state.failed {
            debug!(tx = %tx, "transaction chain failed");
        }
        state.failed = true;
        state.speculative = None;
    }
}

/// The state a readied overlay would commit, as a snapshot at base + 1.
pub(crate) fn speculate(tx: TxId, overlay: &Overlay) -> Arc<Snapshot> {
    let base = overlay.base();
    let version = base.version().next();
    let (tree, _) = build_commit(tx, base, overlay.root(), version);
    Arc::new(Snapshot::new(
        version,
        Some(tx),
        tree,
        Arc::clone(base.schema()),
    ))
}

/// Sequence of transactions with at most one open at a time.
pub struct TransactionChain {
    store: Arc<StoreInner>,
    shared: Arc<ChainShared>,
}

impl TransactionChain {
    pub(crate) fn new(store: Arc<StoreInner>) -> Self {
        Self {
            store,
            shared: Arc::new(ChainShared::default()),
        }
    }

    /// Read-only view of the chain's latest state. Does not occupy the
    /// chain's open slot.
    ///
    /// # Errors
    /// [`IllegalStateError::ChainClosed`] or [`IllegalStateError::ChainFailed`].
    pub fn new_read_only_transaction(&self) -> Result<ReadOnlyTransaction, StoreError> {
        let base = self.shared.read_base(&self.store)?;
        Ok(ReadOnlyTransaction::open(&self.store, base))
    }

    /// Opens the chain's next write-only transaction.
    ///
    /// # Errors
    /// [`IllegalStateError::ChainBusy`] while another chained transaction is
    /// open, plus the closed/failed errors.
    pub fn new_write_only_transaction(&self) -> Result<WriteOnlyTransaction, StoreError> {
        let tx = self.store.next_tx();
        let base = self.shared.allocate(&self.store, tx)?;
        Ok(WriteOnlyTransaction::open(
            &self.store,
            base,
            Some((Arc::clone(&self.shared), tx)),
        ))
    }

    /// Opens the chain's next read-write transaction.
    ///
    /// # Errors
    /// Same as [`TransactionChain::new_write_only_transaction`].
    pub fn new_read_write_transaction(&self) -> Result<ReadWriteTransaction, StoreError> {
        let tx = self.store.next_tx();
        let base = self.shared.allocate(&self.store, tx)?;
        Ok(ReadWriteTransaction::open(
            &self.store,
            base,
            Some((Arc::clone(&self.shared), tx)),
        ))
    }

    /// Returns `true` once a chained cohort aborted or was dropped.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.shared.state.lock().failed
    }

    /// Forbids new transactions. Already readied cohorts may still commit.
    pub fn close(&self) {
        let mut state = self.shared.state.lock();
        if !state.closed {
            debug!("transaction chain closed");
        }
        state.closed = true;
    }
}

impl std::fmt::Debug for TransactionChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionChain")
            .field("state", &*self.shared.state.lock())
            .finish()
    }
}
