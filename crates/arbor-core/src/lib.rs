// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! arbor-core: in-process, schema-aware versioned tree store.
//!
//! Readers pin an immutable [`Snapshot`]; writers stage changes in a private
//! overlay and publish them through a three-phase [`CommitCohort`]
//! (`can_commit`, `pre_commit`, `commit`). Conflicts are detected at whole-tree
//! version granularity, unmodified subtrees are shared between snapshots, and
//! every commit yields one [`DataTreeCandidate`] for the registered listeners.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::use_self
)]

mod candidate;
mod chain;
mod cohort;
mod config;
mod error;
mod ident;
mod listener;
mod node;
mod overlay;
mod path;
mod resolver;
mod schema;
mod snapshot;
mod store;
mod stream;
mod transaction;
mod tree;
mod tx;

// Re-exports for stable public API
/// Commit diffs delivered to listeners.
pub use candidate::{CandidateNode, DataTreeCandidate, ModificationType};
/// Transaction chains.
pub use chain::TransactionChain;
/// Three-phase commit cohort.
pub use cohort::{CohortState, CommitCohort};
/// Store configuration.
pub use config::StoreConfig;
/// Error taxonomy.
pub use error::{ConflictError, IllegalStateError, StoreError, ValidationError};
/// Names, scalar values and node identifiers.
pub use ident::{NodeIdentifier, QName, Value};
/// Change listeners.
pub use listener::{DataTreeChangeListener, ListenerRegistration};
/// Immutable data nodes.
pub use node::{Children, CompositeKind, DataNode, NodeData};
/// Absolute node addresses.
pub use path::Path;
/// Schema model consumed by the store.
pub use schema::{SchemaKey, SchemaKind, SchemaModel, SchemaNode};
/// Committed snapshots.
pub use snapshot::{Hash, Snapshot};
/// The store handle.
pub use store::DataStore;
/// Schema-ordered streaming.
pub use stream::{write_node, NodeStreamWriter};
/// Transaction handles and traits.
pub use transaction::{
    DataRead, DataWrite, ReadOnlyTransaction, ReadWriteTransaction, WriteOnlyTransaction,
};
/// Versioned tree nodes.
pub use tree::TreeNode;
/// Transaction identifiers and version stamps.
pub use tx::{TxId, Version};
