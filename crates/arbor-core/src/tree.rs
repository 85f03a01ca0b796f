// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Versioned metadata nodes that make up a committed snapshot.
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::ident::NodeIdentifier;
use crate::node::DataNode;
use crate::path::Path;
use crate::tx::Version;

/// A committed data node stamped with the version of the last commit that
/// changed it or any of its descendants.
///
/// Invariant: a child's version never exceeds its parent's. Children mirror
/// the composite children of `data` one-to-one; scalars have none.
#[derive(Debug)]
pub struct TreeNode {
    data: DataNode,
    version: Version,
    children: BTreeMap<NodeIdentifier, Arc<TreeNode>>,
}

impl TreeNode {
    /// Wraps a whole data subtree, stamping every node with `version`.
    #[must_use]
    pub fn new(data: DataNode, version: Version) -> Arc<Self> {
        let children = data
            .children()
            .map(|map| {
                map.iter()
                    .map(|(id, child)| (id.clone(), Self::new(child.clone(), version)))
                    .collect()
            })
            .unwrap_or_default();
        Arc::new(Self {
            data,
            version,
            children,
        })
    }

    /// Assembles a node from an already versioned set of children.
    pub(crate) fn from_parts(
        data: DataNode,
        version: Version,
        children: BTreeMap<NodeIdentifier, Arc<TreeNode>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            data,
            version,
            children,
        })
    }

    /// Data payload.
    #[must_use]
    pub fn data(&self) -> &DataNode {
        &self.data
    }

    /// Version of the last commit that touched this subtree.
    #[must_use]
    pub fn version(&self) -> Version {
        self.version
    }

    /// Looks up a direct child.
    #[must_use]
    pub fn child(&self, id: &NodeIdentifier) -> Option<&Arc<TreeNode>> {
        self.children.get(id)
    }

    /// Versioned children keyed by identifier.
    #[must_use]
    pub fn children(&self) -> &BTreeMap<NodeIdentifier, Arc<TreeNode>> {
        &self.children
    }

    /// Walks an absolute path treating `self` as the root.
    #[must_use]
    pub fn find(&self, path: &Path) -> Option<&TreeNode> {
        path.identifiers()
            .iter()
            .try_fold(self, |node, id| node.child(id).map(AsRef::as_ref))
    }
}
