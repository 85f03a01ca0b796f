// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Three-phase commit cohort.
//!
//! `can_commit` checks the base version and validates; `pre_commit` claims
//! the store's single commit slot and builds the next snapshot and its
//! candidate without publishing anything; `commit` swaps the snapshot
//! pointer. Holding the slot from `pre_commit` onwards is what makes
//! `commit` infallible.
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::candidate::{build_commit, DataTreeCandidate};
use crate::chain::ChainShared;
use crate::error::{ConflictError, IllegalStateError, StoreError};
use crate::overlay::Overlay;
use crate::snapshot::Snapshot;
use crate::store::StoreInner;
use crate::tx::{TxId, Version};

/// Phase of a commit cohort.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CohortState {
    /// Handed over by `ready`; no phase has run yet.
    Readied,
    /// `can_commit` succeeded.
    CanCommitted,
    /// `pre_commit` succeeded; the commit slot is held.
    PreCommitted,
    /// Terminal: the snapshot is published.
    Committed,
    /// Terminal: discarded without effect.
    Aborted,
}

struct Prepared {
    snapshot: Arc<Snapshot>,
    candidate: Arc<DataTreeCandidate>,
}

/// Sequences `can_commit`, `pre_commit`, `commit` and `abort` for one
/// readied transaction.
pub struct CommitCohort {
    tx: TxId,
    store: Arc<StoreInner>,
    overlay: Overlay,
    state: CohortState,
    prepared: Option<Prepared>,
    chain: Option<Arc<ChainShared>>,
}

impl CommitCohort {
    pub(crate) fn new(
        tx: TxId,
        store: Arc<StoreInner>,
        overlay: Overlay,
        chain: Option<Arc<ChainShared>>,
    ) -> Self {
        Self {
            tx,
            store,
            overlay,
            state: CohortState::Readied,
            prepared: None,
            chain,
        }
    }

    /// Transaction this cohort commits.
    #[must_use]
    pub fn tx(&self) -> TxId {
        self.tx
    }

    /// Current phase.
    #[must_use]
    pub fn state(&self) -> CohortState {
        self.state
    }

    /// Version the transaction read from.
    #[must_use]
    pub fn base_version(&self) -> Version {
        self.overlay.base_version()
    }

    /// Candidate computed by `pre_commit`.
    #[must_use]
    pub fn candidate(&self) -> Option<&DataTreeCandidate> {
        self.prepared.as_ref().map(|p| p.candidate.as_ref())
    }

    fn require(&self, expected: CohortState) -> Result<(), IllegalStateError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(IllegalStateError::OutOfOrder {
                tx: self.tx,
                expected,
                actual: self.state,
            })
        }
    }

    /// Checks that the store is still at the base version and validates
    /// every modified path.
    ///
    /// # Errors
    /// [`ConflictError::StaleBase`] when another commit got in first;
    /// [`ValidationError`](crate::ValidationError) when a structural rule is
    /// violated; [`IllegalStateError::OutOfOrder`] unless readied.
    pub fn can_commit(&mut self) -> Result<(), StoreError> {
        self.require(CohortState::Readied)?;
        let current = self.store.current();
        if !current.descends_unchanged_from(self.overlay.base()) {
            debug!(
                tx = %self.tx,
                base = %self.overlay.base_version(),
                current = %current.version(),
                "can-commit conflict"
            );
            return Err(ConflictError::StaleBase {
                base: self.overlay.base_version(),
                current: current.version(),
            }
            .into());
        }
        self.overlay.validate()?;
        self.state = CohortState::CanCommitted;
        debug!(tx = %self.tx, "can-commit");
        Ok(())
    }

    /// Claims the commit slot and builds the next snapshot and candidate.
    /// Nothing is published yet.
    ///
    /// # Errors
    /// [`ConflictError::CommitInProgress`] when another cohort holds the
    /// slot; [`ConflictError::StaleBase`] when the store moved on;
    /// [`IllegalStateError::OutOfOrder`] unless `can_commit` succeeded.
    pub fn pre_commit(&mut self) -> Result<(), StoreError> {
        self.require(CohortState::CanCommitted)?;
        let current = match self.store.claim_slot(self.tx, self.overlay.base()) {
            Ok(current) => current,
            Err(err) => {
                debug!(tx = %self.tx, error = %err, "pre-commit conflict");
                return Err(err.into());
            }
        };
        let root = match self.overlay.replay(&current) {
            Ok(root) => root,
            Err(err) => {
                self.store.release_slot(self.tx);
                return Err(err.into());
            }
        };
        let version = current.version().next();
        let (tree, candidate) = build_commit(self.tx, &current, &root, version);
        let snapshot = Snapshot::new(version, Some(self.tx), tree, Arc::clone(current.schema()));
        debug!(
            tx = %self.tx,
            version = %version,
            changed = candidate.changed_paths().len(),
            "pre-commit"
        );
        self.prepared = Some(Prepared {
            snapshot: Arc::new(snapshot),
            candidate: Arc::new(candidate),
        });
        self.state = CohortState::PreCommitted;
        Ok(())
    }

    /// Publishes the prepared snapshot and returns the new store version.
    ///
    /// The candidate has reached every listener when this returns, unless
    /// the call comes from inside a listener callback. Before delivering its
    /// own candidate the call may wait for earlier commits' deliveries, never
    /// for later ones.
    ///
    /// # Errors
    /// Only [`IllegalStateError::OutOfOrder`] when `pre_commit` has not
    /// succeeded; once pre-committed this cannot fail.
    #[instrument(skip(self), fields(store = %self.store.config().name, tx = %self.tx))]
    pub fn commit(&mut self) -> Result<Version, StoreError> {
        self.require(CohortState::PreCommitted)?;
        let Some(prepared) = self.prepared.as_ref() else {
            return Err(IllegalStateError::OutOfOrder {
                tx: self.tx,
                expected: CohortState::PreCommitted,
                actual: self.state,
            }
            .into());
        };
        let version = prepared.snapshot.version();
        let changed = prepared.candidate.changed_paths().len();
        self.store.publish(
            self.tx,
            Arc::clone(&prepared.snapshot),
            Arc::clone(&prepared.candidate),
        );
        self.state = CohortState::Committed;
        if let Some(chain) = &self.chain {
            chain.on_committed(self.tx);
        }
        debug!(version = %version, changed, "committed");
        self.store.notify_through(version);
        Ok(version)
    }

    /// Discards the cohort, releasing the commit slot if held. Idempotent.
    ///
    /// # Errors
    /// [`IllegalStateError::OutOfOrder`] after `commit`.
    pub fn abort(&mut self) -> Result<(), StoreError> {
        match self.state {
            CohortState::Aborted => return Ok(()),
            CohortState::Committed => {
                return Err(IllegalStateError::OutOfOrder {
                    tx: self.tx,
                    expected: CohortState::PreCommitted,
                    actual: CohortState::Committed,
                }
                .into());
            }
            CohortState::PreCommitted => self.store.release_slot(self.tx),
            CohortState::Readied | CohortState::CanCommitted => {}
        }
        debug!(tx = %self.tx, from = ?self.state, "cohort aborted");
        self.state = CohortState::Aborted;
        self.prepared = None;
        if let Some(chain) = &self.chain {
            chain.on_failed(self.tx);
        }
        Ok(())
    }
}

impl Drop for CommitCohort {
    fn drop(&mut self) {
        match self.state {
            CohortState::Committed | CohortState::Aborted => {}
            CohortState::PreCommitted => {
                warn!(tx = %self.tx, "pre-committed cohort dropped; releasing commit slot");
                self.store.release_slot(self.tx);
                if let Some(chain) = &self.chain {
                    chain.on_failed(self.tx);
                }
            }
            CohortState::Readied | CohortState::CanCommitted => {
                if let Some(chain) = &self.chain {
                    chain.on_failed(self.tx);
                }
            }
        }
    }
}

impl std::fmt::Debug for CommitCohort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitCohort")
            .field("tx", &self.tx)
            .field("state", &self.state)
            .field("base", &self.overlay.base_version())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::node::DataNode;
    use crate::path::Path;
    use crate::schema::{SchemaModel, SchemaNode};
    use crate::store::DataStore;
    use crate::transaction::DataWrite;

    fn store() -> DataStore {
        DataStore::new(SchemaModel::new([SchemaNode::container(
            "test",
            [SchemaNode::leaf("value")],
        )]))
    }

    fn readied(store: &DataStore) -> CommitCohort {
        let mut tx = store.new_write_only_transaction();
        let res = tx.write(&Path::root().child("test"), DataNode::container("test", []));
        assert!(res.is_ok(), "write failed: {res:?}");
        match tx.ready() {
            Ok(cohort) => cohort,
            Err(err) => panic!("ready failed: {err:?}"),
        }
    }

    #[test]
    fn phases_out_of_order_are_rejected() {
        let store = store();
        let mut cohort = readied(&store);
        let res = cohort.pre_commit();
        assert!(
            matches!(
                res,
                Err(StoreError::IllegalState(IllegalStateError::OutOfOrder {
                    expected: CohortState::CanCommitted,
                    actual: CohortState::Readied,
                    ..
                }))
            ),
            "got {res:?}"
        );
        assert!(matches!(cohort.commit(), Err(StoreError::IllegalState(_))));
        assert_eq!(cohort.state(), CohortState::Readied);
    }

    #[test]
    fn abort_after_pre_commit_releases_slot_and_leaves_store_unchanged() {
        let store = store();
        let before = store.snapshot().state_root();
        let mut cohort = readied(&store);
        assert!(cohort.can_commit().is_ok());
        assert!(cohort.pre_commit().is_ok());
        assert!(cohort.candidate().is_some());
        assert!(cohort.abort().is_ok());
        assert!(cohort.abort().is_ok(), "abort must be idempotent");
        assert_eq!(store.snapshot().state_root(), before);
        assert_eq!(store.version(), Version::INITIAL);

        let mut next = readied(&store);
        assert!(next.can_commit().is_ok());
        assert!(next.pre_commit().is_ok(), "slot must be free again");
        assert!(next.commit().is_ok());
    }

    #[test]
    fn second_pre_commit_fails_fast_while_slot_held() {
        let store = store();
        let mut first = readied(&store);
        let mut second = readied(&store);
        assert!(first.can_commit().is_ok());
        assert!(second.can_commit().is_ok());
        assert!(first.pre_commit().is_ok());
        let res = second.pre_commit();
        assert!(
            matches!(
                res,
                Err(StoreError::Conflict(ConflictError::CommitInProgress { holder })) if holder == first.tx()
            ),
            "got {res:?}"
        );
        assert!(first.commit().is_ok());
        assert!(second.abort().is_ok());
    }

    #[test]
    fn dropping_pre_committed_cohort_frees_the_slot() {
        let store = store();
        {
            let mut cohort = readied(&store);
            assert!(cohort.can_commit().is_ok());
            assert!(cohort.pre_commit().is_ok());
        }
        let mut next = readied(&store);
        assert!(next.can_commit().is_ok());
        assert!(next.pre_commit().is_ok());
    }

    #[test]
    fn abort_after_commit_is_rejected() {
        let store = store();
        let mut cohort = readied(&store);
        assert!(cohort.can_commit().is_ok());
        assert!(cohort.pre_commit().is_ok());
        assert!(cohort.commit().is_ok());
        assert!(matches!(cohort.abort(), Err(StoreError::IllegalState(_))));
        assert_eq!(cohort.state(), CohortState::Committed);
    }
}
