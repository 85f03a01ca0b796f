// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Committed snapshots and their state digest.
//!
//! Determinism contract for [`Snapshot::state_root`]
//! - The digest is BLAKE3 over a canonical byte stream of the data tree,
//!   visited depth-first from the root.
//! - Children are visited in `BTreeMap` order of their identifiers, which is
//!   total and stable across runs.
//! - Every variable-length field (names, strings, binaries, child and key
//!   counts) is preceded by an 8-byte little-endian length; every enum is
//!   preceded by a one-byte tag.
//! - Versions are not part of the digest: two snapshots holding equal data
//!   hash equal regardless of history.
use std::sync::Arc;

use blake3::Hasher;

use crate::ident::{NodeIdentifier, QName, Value};
use crate::node::{CompositeKind, DataNode, NodeData};
use crate::path::Path;
use crate::schema::SchemaModel;
use crate::tree::TreeNode;
use crate::tx::{TxId, Version};

/// 32-byte BLAKE3 digest.
pub type Hash = [u8; 32];

/// One immutable, fully committed state of the tree.
#[derive(Debug, Clone)]
pub struct Snapshot {
    version: Version,
    tx: Option<TxId>,
    root: Arc<TreeNode>,
    schema: Arc<SchemaModel>,
}

impl Snapshot {
    pub(crate) fn new(
        version: Version,
        tx: Option<TxId>,
        root: Arc<TreeNode>,
        schema: Arc<SchemaModel>,
    ) -> Self {
        Self {
            version,
            tx,
            root,
            schema,
        }
    }

    /// Empty snapshot at [`Version::INITIAL`].
    pub(crate) fn empty(schema: Arc<SchemaModel>) -> Self {
        Self::new(
            Version::INITIAL,
            None,
            TreeNode::new(DataNode::empty_root(), Version::INITIAL),
            schema,
        )
    }

    /// Store version this snapshot was committed at.
    #[must_use]
    pub fn version(&self) -> Version {
        self.version
    }

    /// Transaction that produced this snapshot; `None` for the initial one.
    #[must_use]
    pub fn tx(&self) -> Option<TxId> {
        self.tx
    }

    /// Returns `true` when `self` is the state `base` describes: same
    /// version, produced by the same transaction.
    ///
    /// Speculative snapshots of a transaction chain match the snapshot their
    /// transaction later commits.
    #[must_use]
    pub fn descends_unchanged_from(&self, base: &Snapshot) -> bool {
        self.version == base.version && self.tx == base.tx
    }

    /// Versioned root node.
    #[must_use]
    pub fn root(&self) -> &Arc<TreeNode> {
        &self.root
    }

    /// Root data node.
    #[must_use]
    pub fn root_data(&self) -> &DataNode {
        self.root.data()
    }

    /// Schema the snapshot was validated against.
    #[must_use]
    pub fn schema(&self) -> &Arc<SchemaModel> {
        &self.schema
    }

    /// Reads the node at `path`; absence is not an error.
    #[must_use]
    pub fn read(&self, path: &Path) -> Option<DataNode> {
        self.root.find(path).map(|node| node.data().clone())
    }

    /// Version of the last commit that touched the subtree at `path`.
    #[must_use]
    pub fn version_at(&self, path: &Path) -> Option<Version> {
        self.root.find(path).map(TreeNode::version)
    }

    /// Canonical digest of the committed data.
    #[must_use]
    pub fn state_root(&self) -> Hash {
        compute_state_root(self.root.data())
    }

    /// [`Snapshot::state_root`] as lowercase hex, for logs and fixtures.
    #[must_use]
    pub fn state_root_hex(&self) -> String {
        hex::encode(self.state_root())
    }
}

/// Computes the canonical digest of a data tree.
pub(crate) fn compute_state_root(root: &DataNode) -> Hash {
    let mut hasher = Hasher::new();
    hash_node(&mut hasher, root);
    hasher.finalize().into()
}

fn hash_node(hasher: &mut Hasher, node: &DataNode) {
    hash_identifier(hasher, node.identifier());
    match node.data() {
        NodeData::Leaf(value) => {
            hasher.update(&[0]);
            hash_value(hasher, value);
        }
        NodeData::LeafSetEntry(value) => {
            hasher.update(&[1]);
            hash_value(hasher, value);
        }
        NodeData::Composite { kind, children } => {
            hasher.update(&[2, composite_tag(*kind)]);
            hasher.update(&(children.len() as u64).to_le_bytes());
            for child in children.values() {
                hash_node(hasher, child);
            }
        }
    }
}

fn composite_tag(kind: CompositeKind) -> u8 {
    match kind {
        CompositeKind::Container => 0,
        CompositeKind::LeafSet => 1,
        CompositeKind::List => 2,
        CompositeKind::ListEntry => 3,
        CompositeKind::Choice => 4,
        CompositeKind::Augmentation => 5,
    }
}

fn hash_identifier(hasher: &mut Hasher, id: &NodeIdentifier) {
    match id {
        NodeIdentifier::Name(name) => {
            hasher.update(&[0]);
            hash_name(hasher, name);
        }
        NodeIdentifier::Entry { name, keys } => {
            hasher.update(&[1]);
            hash_name(hasher, name);
            hasher.update(&(keys.len() as u64).to_le_bytes());
            for (key, value) in keys {
                hash_name(hasher, key);
                hash_value(hasher, value);
            }
        }
        NodeIdentifier::LeafValue { name, value } => {
            hasher.update(&[2]);
            hash_name(hasher, name);
            hash_value(hasher, value);
        }
        NodeIdentifier::Augmentation(names) => {
            hasher.update(&[3]);
            hasher.update(&(names.len() as u64).to_le_bytes());
            for name in names {
                hash_name(hasher, name);
            }
        }
    }
}

fn hash_name(hasher: &mut Hasher, name: &QName) {
    hash_bytes(hasher, name.as_str().as_bytes());
}

fn hash_bytes(hasher: &mut Hasher, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

fn hash_value(hasher: &mut Hasher, value: &Value) {
    match value {
        Value::Empty => {
            hasher.update(&[0]);
        }
        Value::Bool(v) => {
            hasher.update(&[1, u8::from(*v)]);
        }
        Value::Int(v) => {
            hasher.update(&[2]);
            hasher.update(&v.to_le_bytes());
        }
        Value::Uint(v) => {
            hasher.update(&[3]);
            hasher.update(&v.to_le_bytes());
        }
        Value::String(v) => {
            hasher.update(&[4]);
            hash_bytes(hasher, v.as_bytes());
        }
        Value::Binary(v) => {
            hasher.update(&[5]);
            hash_bytes(hasher, v);
        }
    }
}
