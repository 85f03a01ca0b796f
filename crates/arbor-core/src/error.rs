// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error taxonomy for store operations.
use thiserror::Error;

use crate::cohort::CohortState;
use crate::ident::{NodeIdentifier, QName};
use crate::path::Path;
use crate::tx::{TxId, Version};

/// Top-level error returned by every fallible store operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The transaction lost an optimistic-concurrency race; abort and retry.
    #[error(transparent)]
    Conflict(#[from] ConflictError),
    /// A structural rule was violated; the offending write is a caller bug.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// A handle or cohort was used out of order.
    #[error(transparent)]
    IllegalState(#[from] IllegalStateError),
}

/// Optimistic-concurrency failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConflictError {
    /// The store advanced past the version the transaction was based on.
    #[error("stale base: transaction based on {base}, store is at {current}")]
    StaleBase {
        /// Version the transaction read.
        base: Version,
        /// Version the store is at now.
        current: Version,
    },
    /// Another cohort holds the pre-commit slot.
    #[error("commit in progress by transaction {holder}")]
    CommitInProgress {
        /// Transaction holding the slot.
        holder: TxId,
    },
}

/// Structural rule violations detected by the operation resolver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The schema has no node at this position.
    #[error("no schema node at {path}")]
    UnknownSchemaNode {
        /// Offending path.
        path: Path,
    },
    /// The node's identifier differs from the last component of its path.
    #[error("identifier mismatch at {path}: expected {expected}, got {actual}")]
    IdentifierMismatch {
        /// Offending path.
        path: Path,
        /// Identifier implied by the path.
        expected: NodeIdentifier,
        /// Identifier carried by the node.
        actual: NodeIdentifier,
    },
    /// The node's structural kind differs from the schema's.
    #[error("kind mismatch at {path}: schema expects {expected}")]
    KindMismatch {
        /// Offending path.
        path: Path,
        /// Kind required by the schema.
        expected: &'static str,
    },
    /// A list entry lacks a declared key field.
    #[error("list entry {path} is missing key {key}")]
    MissingKey {
        /// Entry path.
        path: Path,
        /// Missing key name.
        key: QName,
    },
    /// A key leaf disagrees with the entry identifier, or the identifier
    /// names a field that is not a declared key.
    #[error("list entry {path} has inconsistent key {key}")]
    KeyMismatch {
        /// Entry path.
        path: Path,
        /// Offending key name.
        key: QName,
    },
    /// A choice holds children from more than one case.
    #[error("choice {path} designates several cases: {cases:?}")]
    AmbiguousChoice {
        /// Choice path.
        path: Path,
        /// Cases found.
        cases: Vec<QName>,
    },
    /// A choice holds no case.
    #[error("choice {path} designates no case")]
    MissingChoiceCase {
        /// Choice path.
        path: Path,
    },
    /// A choice child belongs to no declared case.
    #[error("choice {path} has child {child} outside every case")]
    UnknownChoiceCase {
        /// Choice path.
        path: Path,
        /// Offending child.
        child: NodeIdentifier,
    },
}

/// State-machine misuse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IllegalStateError {
    /// The transaction was closed or aborted.
    #[error("transaction {tx} is closed")]
    TransactionClosed {
        /// Transaction.
        tx: TxId,
    },
    /// The transaction was already readied; no further writes are accepted.
    #[error("transaction {tx} is already ready")]
    TransactionReady {
        /// Transaction.
        tx: TxId,
    },
    /// A cohort phase was invoked out of order.
    #[error("transaction {tx}: expected cohort state {expected:?}, found {actual:?}")]
    OutOfOrder {
        /// Transaction.
        tx: TxId,
        /// State the phase requires.
        expected: CohortState,
        /// State the cohort is in.
        actual: CohortState,
    },
    /// The chain already has an open transaction.
    #[error("transaction chain busy: transaction {tx} is still open")]
    ChainBusy {
        /// Open transaction.
        tx: TxId,
    },
    /// A chained transaction failed or aborted.
    #[error("transaction chain failed")]
    ChainFailed,
    /// The chain was closed.
    #[error("transaction chain closed")]
    ChainClosed,
}
