// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Data tree candidates: the before/after diff of one commit.
//!
//! The candidate and the new versioned tree are produced by one walk over
//! the old tree and the new data root. Subtrees that are pointer-equal (or
//! deep-equal) to the old ones keep their old tree node and version and
//! never appear in the candidate.
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::ident::NodeIdentifier;
use crate::node::DataNode;
use crate::path::Path;
use crate::snapshot::Snapshot;
use crate::tree::TreeNode;
use crate::tx::{TxId, Version};

/// How a candidate node changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModificationType {
    /// Nothing changed at or below this node.
    Unmodified,
    /// The node was created or replaced wholesale.
    Write,
    /// The node kept its shape; some descendants changed.
    SubtreeModified,
    /// The node was removed.
    Delete,
}

/// One node of a candidate diff.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidateNode {
    identifier: NodeIdentifier,
    modification: ModificationType,
    before: Option<DataNode>,
    after: Option<DataNode>,
    children: BTreeMap<NodeIdentifier, CandidateNode>,
}

impl CandidateNode {
    fn unmodified(node: &DataNode) -> Self {
        Self {
            identifier: node.identifier().clone(),
            modification: ModificationType::Unmodified,
            before: Some(node.clone()),
            after: Some(node.clone()),
            children: BTreeMap::new(),
        }
    }

    /// Identifier within the parent.
    #[must_use]
    pub fn identifier(&self) -> &NodeIdentifier {
        &self.identifier
    }

    /// Kind of change.
    #[must_use]
    pub fn modification(&self) -> ModificationType {
        self.modification
    }

    /// Subtree before the commit; `None` when the node was created.
    #[must_use]
    pub fn before(&self) -> Option<&DataNode> {
        self.before.as_ref()
    }

    /// Subtree after the commit; `None` when the node was deleted.
    #[must_use]
    pub fn after(&self) -> Option<&DataNode> {
        self.after.as_ref()
    }

    /// Modified children. Wholesale writes and deletes carry none; their
    /// before/after subtrees describe the change.
    #[must_use]
    pub fn children(&self) -> &BTreeMap<NodeIdentifier, CandidateNode> {
        &self.children
    }

    fn collect_paths(&self, at: &Path, out: &mut Vec<Path>) {
        if self.modification == ModificationType::Unmodified {
            return;
        }
        out.push(at.clone());
        for (id, child) in &self.children {
            child.collect_paths(&at.node(id.clone()), out);
        }
    }
}

/// The diff of one committed transaction, delivered to listeners.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataTreeCandidate {
    tx: TxId,
    before_version: Version,
    after_version: Version,
    root: CandidateNode,
}

impl DataTreeCandidate {
    /// Committing transaction.
    #[must_use]
    pub fn tx(&self) -> TxId {
        self.tx
    }

    /// Store version the commit was applied to.
    #[must_use]
    pub fn before_version(&self) -> Version {
        self.before_version
    }

    /// Store version the commit produced.
    #[must_use]
    pub fn after_version(&self) -> Version {
        self.after_version
    }

    /// Root of the diff.
    #[must_use]
    pub fn root(&self) -> &CandidateNode {
        &self.root
    }

    /// Returns `true` when the commit changed nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.modification == ModificationType::Unmodified
    }

    /// Every changed path in pre-order, starting at the root.
    #[must_use]
    pub fn changed_paths(&self) -> Vec<Path> {
        let mut out = Vec::new();
        self.root.collect_paths(&Path::root(), &mut out);
        out
    }

    /// Candidate node at `path`, if the diff reaches that deep.
    #[must_use]
    pub fn node(&self, path: &Path) -> Option<&CandidateNode> {
        path.identifiers()
            .iter()
            .try_fold(&self.root, |node, id| node.children.get(id))
    }

    /// Returns `true` when the commit changed anything at, above (by
    /// wholesale replacement) or below `path`.
    #[must_use]
    pub fn touches(&self, path: &Path) -> bool {
        let ids = path.identifiers();
        let mut node = &self.root;
        for (depth, id) in ids.iter().enumerate() {
            match node.modification {
                ModificationType::Unmodified => return false,
                ModificationType::Write | ModificationType::Delete => {
                    let rest = &ids[depth..];
                    let before = node.before.as_ref().and_then(|b| b.descendant(rest));
                    let after = node.after.as_ref().and_then(|a| a.descendant(rest));
                    return before != after;
                }
                ModificationType::SubtreeModified => {}
            }
            match node.children.get(id) {
                Some(child) => node = child,
                None => return false,
            }
        }
        node.modification != ModificationType::Unmodified
    }
}

/// Result of diffing one position.
struct Outcome {
    tree: Option<Arc<TreeNode>>,
    candidate: Option<CandidateNode>,
}

/// Builds the versioned tree for `new_root` on top of `before`, stamping
/// changed nodes with `version`, together with the commit's candidate.
pub(crate) fn build_commit(
    tx: TxId,
    before: &Snapshot,
    new_root: &DataNode,
    version: Version,
) -> (Arc<TreeNode>, DataTreeCandidate) {
    let old_root = before.root();
    let outcome = diff(Some(old_root), Some(new_root), version);
    let tree = outcome.tree.unwrap_or_else(|| TreeNode::new(new_root.clone(), version));
    let root = outcome
        .candidate
        .unwrap_or_else(|| CandidateNode::unmodified(old_root.data()));
    let candidate = DataTreeCandidate {
        tx,
        before_version: before.version(),
        after_version: version,
        root,
    };
    (tree, candidate)
}

fn diff(old: Option<&Arc<TreeNode>>, new: Option<&DataNode>, version: Version) -> Outcome {
    match (old, new) {
        (None, None) => Outcome {
            tree: None,
            candidate: None,
        },
        (None, Some(created)) => Outcome {
            tree: Some(TreeNode::new(created.clone(), version)),
            candidate: Some(CandidateNode {
                identifier: created.identifier().clone(),
                modification: ModificationType::Write,
                before: None,
                after: Some(created.clone()),
                children: BTreeMap::new(),
            }),
        },
        (Some(removed), None) => Outcome {
            tree: None,
            candidate: Some(CandidateNode {
                identifier: removed.data().identifier().clone(),
                modification: ModificationType::Delete,
                before: Some(removed.data().clone()),
                after: None,
                children: BTreeMap::new(),
            }),
        },
        (Some(old), Some(new)) => diff_present(old, new, version),
    }
}

fn diff_present(old: &Arc<TreeNode>, new: &DataNode, version: Version) -> Outcome {
    let unchanged = || Outcome {
        tree: Some(Arc::clone(old)),
        candidate: None,
    };
    if DataNode::ptr_eq(old.data(), new) {
        return unchanged();
    }
    let same_shape = old.data().composite_kind().is_some()
        && old.data().composite_kind() == new.composite_kind()
        && old.data().identifier() == new.identifier();
    if !same_shape {
        if old.data() == new {
            return unchanged();
        }
        return Outcome {
            tree: Some(TreeNode::new(new.clone(), version)),
            candidate: Some(CandidateNode {
                identifier: new.identifier().clone(),
                modification: ModificationType::Write,
                before: Some(old.data().clone()),
                after: Some(new.clone()),
                children: BTreeMap::new(),
            }),
        };
    }

    let empty = BTreeMap::new();
    let new_children = new.children().unwrap_or(&empty);
    let mut tree_children = BTreeMap::new();
    let mut changed = BTreeMap::new();
    let ids = old
        .children()
        .keys()
        .chain(new_children.keys().filter(|id| !old.children().contains_key(*id)));
    for id in ids {
        let outcome = diff(old.child(id), new_children.get(id), version);
        if let Some(tree) = outcome.tree {
            tree_children.insert(id.clone(), tree);
        }
        if let Some(candidate) = outcome.candidate {
            changed.insert(id.clone(), candidate);
        }
    }
    if changed.is_empty() {
        return unchanged();
    }
    Outcome {
        tree: Some(TreeNode::from_parts(new.clone(), version, tree_children)),
        candidate: Some(CandidateNode {
            identifier: new.identifier().clone(),
            modification: ModificationType::SubtreeModified,
            before: Some(old.data().clone()),
            after: Some(new.clone()),
            children: changed,
        }),
    }
}
