// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Immutable data nodes, the values the tree is built from.
//!
//! A [`DataNode`] is a reference-counted handle: cloning it never copies the
//! subtree, and a composite's child map is itself shared until someone
//! replaces a child. Replacing a child copies only the parent's shell (its
//! identifier plus the child map), so untouched siblings stay shared between
//! the committed snapshot and any tree derived from it.
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::ident::{NodeIdentifier, QName, Value};
use crate::path::Path;

/// Children of a composite node, keyed by identifier.
pub type Children = BTreeMap<NodeIdentifier, DataNode>;

/// Structural variant of a composite node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompositeKind {
    /// Unordered composite of named children.
    Container,
    /// Collection of leaf-set entries.
    LeafSet,
    /// Keyed collection of list entries.
    List,
    /// One keyed list entry.
    ListEntry,
    /// The children of the currently active choice case.
    Choice,
    /// Extra children merged into a parent.
    Augmentation,
}

impl CompositeKind {
    /// Short human-readable kind name.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Container => "container",
            Self::LeafSet => "leaf-set",
            Self::List => "list",
            Self::ListEntry => "list entry",
            Self::Choice => "choice",
            Self::Augmentation => "augmentation",
        }
    }
}

/// Payload of a data node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeData {
    /// Scalar leaf.
    Leaf(Value),
    /// Scalar leaf-set entry.
    LeafSetEntry(Value),
    /// Composite with a shared child map.
    Composite {
        /// Structural variant.
        kind: CompositeKind,
        /// Children keyed by identifier.
        children: Arc<Children>,
    },
}

#[derive(Debug, PartialEq, Eq)]
struct NodeInner {
    identifier: NodeIdentifier,
    data: NodeData,
}

/// Immutable value stored at some path.
///
/// Equality is structural; [`DataNode::ptr_eq`] is the cheap identity check
/// used to skip untouched subtrees.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataNode(Arc<NodeInner>);

impl DataNode {
    /// Builds a node from its identifier and payload.
    #[must_use]
    pub fn new(identifier: NodeIdentifier, data: NodeData) -> Self {
        Self(Arc::new(NodeInner { identifier, data }))
    }

    /// Builds a composite node.
    pub fn composite(
        identifier: NodeIdentifier,
        kind: CompositeKind,
        children: impl IntoIterator<Item = DataNode>,
    ) -> Self {
        let children: Children = children
            .into_iter()
            .map(|child| (child.identifier().clone(), child))
            .collect();
        Self::new(
            identifier,
            NodeData::Composite {
                kind,
                children: Arc::new(children),
            },
        )
    }

    /// Scalar leaf.
    pub fn leaf(name: &str, value: impl Into<Value>) -> Self {
        Self::new(NodeIdentifier::name(name), NodeData::Leaf(value.into()))
    }

    /// Container.
    pub fn container(name: &str, children: impl IntoIterator<Item = DataNode>) -> Self {
        Self::composite(NodeIdentifier::name(name), CompositeKind::Container, children)
    }

    /// Empty root container.
    #[must_use]
    pub fn empty_root() -> Self {
        Self::composite(NodeIdentifier::root(), CompositeKind::Container, [])
    }

    /// Root container with the given top-level children.
    pub fn root(children: impl IntoIterator<Item = DataNode>) -> Self {
        Self::composite(NodeIdentifier::root(), CompositeKind::Container, children)
    }

    /// Keyed list holding `entries`.
    pub fn list(name: &str, entries: impl IntoIterator<Item = DataNode>) -> Self {
        Self::composite(NodeIdentifier::name(name), CompositeKind::List, entries)
    }

    /// Keyed list entry. Key leaves named in `keys` are added to `children`
    /// unless already present.
    pub fn list_entry<K, V>(
        list: &str,
        keys: impl IntoIterator<Item = (K, V)>,
        children: impl IntoIterator<Item = DataNode>,
    ) -> Self
    where
        K: Into<QName>,
        V: Into<Value>,
    {
        let identifier = NodeIdentifier::entry(list, keys);
        let mut map: Children = children
            .into_iter()
            .map(|child| (child.identifier().clone(), child))
            .collect();
        if let NodeIdentifier::Entry { keys, .. } = &identifier {
            for (key, value) in keys {
                map.entry(NodeIdentifier::Name(key.clone())).or_insert_with(|| {
                    Self::new(
                        NodeIdentifier::Name(key.clone()),
                        NodeData::Leaf(value.clone()),
                    )
                });
            }
        }
        Self::new(
            identifier,
            NodeData::Composite {
                kind: CompositeKind::ListEntry,
                children: Arc::new(map),
            },
        )
    }

    /// Leaf-set holding one entry per value.
    pub fn leaf_set<V: Into<Value>>(name: &str, values: impl IntoIterator<Item = V>) -> Self {
        let entries = values.into_iter().map(|v| Self::leaf_set_entry(name, v));
        Self::composite(NodeIdentifier::name(name), CompositeKind::LeafSet, entries)
    }

    /// Leaf-set entry.
    pub fn leaf_set_entry(leaf_set: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        Self::new(
            NodeIdentifier::leaf_value(leaf_set, value.clone()),
            NodeData::LeafSetEntry(value),
        )
    }

    /// Choice holding the children of one case.
    pub fn choice(name: &str, children: impl IntoIterator<Item = DataNode>) -> Self {
        Self::composite(NodeIdentifier::name(name), CompositeKind::Choice, children)
    }

    /// Augmentation identified by every child name its schema declares
    /// (`members`), holding whichever of them are present in `children`.
    pub fn augmentation(members: &[&str], children: impl IntoIterator<Item = DataNode>) -> Self {
        Self::composite(
            NodeIdentifier::augmentation(members.iter().copied()),
            CompositeKind::Augmentation,
            children,
        )
    }

    /// Identifier of this node within its parent.
    #[must_use]
    pub fn identifier(&self) -> &NodeIdentifier {
        &self.0.identifier
    }

    /// Payload.
    #[must_use]
    pub fn data(&self) -> &NodeData {
        &self.0.data
    }

    /// Scalar value for leaves and leaf-set entries.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match &self.0.data {
            NodeData::Leaf(v) | NodeData::LeafSetEntry(v) => Some(v),
            NodeData::Composite { .. } => None,
        }
    }

    /// Composite variant, `None` for scalars.
    #[must_use]
    pub fn composite_kind(&self) -> Option<CompositeKind> {
        match &self.0.data {
            NodeData::Composite { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Child map for composites.
    #[must_use]
    pub fn children(&self) -> Option<&Children> {
        match &self.0.data {
            NodeData::Composite { children, .. } => Some(children),
            _ => None,
        }
    }

    /// Looks up a direct child.
    #[must_use]
    pub fn child(&self, id: &NodeIdentifier) -> Option<&DataNode> {
        self.children()?.get(id)
    }

    /// Looks up a descendant by a path relative to this node.
    #[must_use]
    pub fn descendant(&self, relative: &[NodeIdentifier]) -> Option<&DataNode> {
        relative
            .iter()
            .try_fold(self, |node, id| node.child(id))
    }

    /// Looks up a descendant addressed by an absolute path, treating `self`
    /// as the root.
    #[must_use]
    pub fn find(&self, path: &Path) -> Option<&DataNode> {
        self.descendant(path.identifiers())
    }

    /// Returns `true` when both handles point at the same allocation.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    /// Returns a copy of this composite with one child inserted, replaced or
    /// (for `None`) removed. Only the shell and the child map are copied.
    ///
    /// Scalars are returned unchanged.
    #[must_use]
    pub fn with_child(&self, id: &NodeIdentifier, child: Option<DataNode>) -> Self {
        let NodeData::Composite { kind, children } = &self.0.data else {
            return self.clone();
        };
        let mut children = Arc::clone(children);
        let map = Arc::make_mut(&mut children);
        match child {
            Some(child) => {
                map.insert(id.clone(), child);
            }
            None => {
                map.remove(id);
            }
        }
        Self::new(
            self.0.identifier.clone(),
            NodeData::Composite {
                kind: *kind,
                children,
            },
        )
    }

    /// Returns a copy of this composite with its child map replaced.
    #[must_use]
    pub fn with_children(&self, children: Children) -> Self {
        match &self.0.data {
            NodeData::Composite { kind, .. } => Self::new(
                self.0.identifier.clone(),
                NodeData::Composite {
                    kind: *kind,
                    children: Arc::new(children),
                },
            ),
            _ => self.clone(),
        }
    }
}
