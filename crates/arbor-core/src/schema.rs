// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Read-only schema model: structural kind and key fields per tree position.
//!
//! The schema language and its compiler live outside this crate; callers hand
//! the store an already-built [`SchemaModel`]. Children are kept in
//! declaration order so the stream walker can emit data in schema order.
use std::collections::BTreeSet;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::ident::{NodeIdentifier, QName};
use crate::path::Path;

/// Schema-side address of a child, derived from a [`NodeIdentifier`] by
/// dropping key and leaf values.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SchemaKey {
    /// Plainly named child.
    Name(QName),
    /// Entry schema of the named list.
    Entry(QName),
    /// Entry schema of the named leaf-set.
    LeafValue(QName),
    /// Augmentation covering these child names.
    Augmentation(BTreeSet<QName>),
}

impl From<&NodeIdentifier> for SchemaKey {
    fn from(id: &NodeIdentifier) -> Self {
        match id {
            NodeIdentifier::Name(name) => Self::Name(name.clone()),
            NodeIdentifier::Entry { name, .. } => Self::Entry(name.clone()),
            NodeIdentifier::LeafValue { name, .. } => Self::LeafValue(name.clone()),
            NodeIdentifier::Augmentation(names) => Self::Augmentation(names.clone()),
        }
    }
}

/// Structural kind of a schema position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SchemaKind {
    /// Unordered composite of named children.
    Container,
    /// Scalar leaf.
    Leaf,
    /// Collection of scalar entries.
    LeafSet,
    /// One entry of a leaf-set.
    LeafSetEntry,
    /// Keyed collection of entries.
    List {
        /// Key leaf names, in declaration order.
        keys: Vec<QName>,
    },
    /// One entry of a keyed list.
    ListEntry {
        /// Key leaf names, in declaration order.
        keys: Vec<QName>,
    },
    /// Exclusive choice between cases; the data node holds the children of
    /// exactly one case.
    Choice {
        /// Case name to the schema keys of the children belonging to it.
        cases: IndexMap<QName, BTreeSet<SchemaKey>>,
    },
    /// Extra children merged into a parent container.
    Augmentation,
}

impl SchemaKind {
    /// Short human-readable kind name used in errors.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Container => "container",
            Self::Leaf => "leaf",
            Self::LeafSet => "leaf-set",
            Self::LeafSetEntry => "leaf-set entry",
            Self::List { .. } => "list",
            Self::ListEntry { .. } => "list entry",
            Self::Choice { .. } => "choice",
            Self::Augmentation => "augmentation",
        }
    }
}

/// One node of the schema tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaNode {
    key: SchemaKey,
    kind: SchemaKind,
    children: IndexMap<SchemaKey, Arc<SchemaNode>>,
}

impl SchemaNode {
    fn composite(key: SchemaKey, kind: SchemaKind, children: impl IntoIterator<Item = Self>) -> Self {
        Self {
            key,
            kind,
            children: children
                .into_iter()
                .map(|child| (child.key.clone(), Arc::new(child)))
                .collect(),
        }
    }

    /// Container with the given children.
    pub fn container(name: &str, children: impl IntoIterator<Item = Self>) -> Self {
        Self::composite(
            SchemaKey::Name(QName::new(name)),
            SchemaKind::Container,
            children,
        )
    }

    /// Scalar leaf.
    #[must_use]
    pub fn leaf(name: &str) -> Self {
        Self::composite(SchemaKey::Name(QName::new(name)), SchemaKind::Leaf, [])
    }

    /// Leaf-set; its single child is the entry schema.
    #[must_use]
    pub fn leaf_set(name: &str) -> Self {
        let qname = QName::new(name);
        let entry = Self::composite(
            SchemaKey::LeafValue(qname.clone()),
            SchemaKind::LeafSetEntry,
            [],
        );
        Self::composite(SchemaKey::Name(qname), SchemaKind::LeafSet, [entry])
    }

    /// Keyed list; `children` describe the entry's children and must include
    /// the key leaves.
    pub fn list(name: &str, keys: &[&str], children: impl IntoIterator<Item = Self>) -> Self {
        let qname = QName::new(name);
        let keys: Vec<QName> = keys.iter().map(|k| QName::new(k)).collect();
        let entry = Self::composite(
            SchemaKey::Entry(qname.clone()),
            SchemaKind::ListEntry { keys: keys.clone() },
            children,
        );
        Self::composite(SchemaKey::Name(qname), SchemaKind::List { keys }, [entry])
    }

    /// Choice between named cases, each contributing its own children.
    pub fn choice<I, C>(name: &str, cases: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, C)>,
        C: IntoIterator<Item = Self>,
    {
        let mut case_map: IndexMap<QName, BTreeSet<SchemaKey>> = IndexMap::new();
        let mut children: Vec<Self> = Vec::new();
        for (case, members) in cases {
            let keys = case_map.entry(QName::new(case)).or_default();
            for member in members {
                keys.insert(member.key.clone());
                children.push(member);
            }
        }
        Self::composite(
            SchemaKey::Name(QName::new(name)),
            SchemaKind::Choice { cases: case_map },
            children,
        )
    }

    /// Augmentation contributing `children` to its parent.
    pub fn augmentation(children: impl IntoIterator<Item = Self>) -> Self {
        let children: Vec<Self> = children.into_iter().collect();
        let names = children
            .iter()
            .filter_map(|child| match &child.key {
                SchemaKey::Name(name) => Some(name.clone()),
                _ => None,
            })
            .collect();
        Self::composite(
            SchemaKey::Augmentation(names),
            SchemaKind::Augmentation,
            children,
        )
    }

    /// Schema-side address of this node within its parent.
    #[must_use]
    pub fn key(&self) -> &SchemaKey {
        &self.key
    }

    /// Structural kind.
    #[must_use]
    pub fn kind(&self) -> &SchemaKind {
        &self.kind
    }

    /// Looks up the child schema for a data identifier.
    #[must_use]
    pub fn child(&self, id: &NodeIdentifier) -> Option<&Self> {
        self.children.get(&SchemaKey::from(id)).map(AsRef::as_ref)
    }

    /// Children in declaration order.
    pub fn children(&self) -> impl Iterator<Item = &Self> {
        self.children.values().map(AsRef::as_ref)
    }

    /// Position of the child `key` in declaration order.
    #[must_use]
    pub fn child_position(&self, key: &SchemaKey) -> Option<usize> {
        self.children.get_index_of(key)
    }

    /// Key leaf names for lists and list entries; empty otherwise.
    #[must_use]
    pub fn list_keys(&self) -> &[QName] {
        match &self.kind {
            SchemaKind::List { keys } | SchemaKind::ListEntry { keys } => keys,
            _ => &[],
        }
    }

    /// For a choice, the case that owns the child `key`.
    #[must_use]
    pub fn case_of(&self, key: &SchemaKey) -> Option<&QName> {
        let SchemaKind::Choice { cases } = &self.kind else {
            return None;
        };
        cases
            .iter()
            .find(|(_, members)| members.contains(key))
            .map(|(case, _)| case)
    }

    /// For a choice, the schema keys belonging to `case`.
    #[must_use]
    pub fn case_members(&self, case: &QName) -> Option<&BTreeSet<SchemaKey>> {
        match &self.kind {
            SchemaKind::Choice { cases } => cases.get(case),
            _ => None,
        }
    }
}

/// Complete schema: a root container whose children are the top-level nodes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaModel {
    root: Arc<SchemaNode>,
}

impl SchemaModel {
    /// Builds a schema from its top-level nodes.
    pub fn new(top_level: impl IntoIterator<Item = SchemaNode>) -> Self {
        Self {
            root: Arc::new(SchemaNode::container(QName::ROOT, top_level)),
        }
    }

    /// Schema with no top-level nodes.
    #[must_use]
    pub fn empty() -> Self {
        Self::new([])
    }

    /// The root container schema.
    #[must_use]
    pub fn root(&self) -> &SchemaNode {
        &self.root
    }

    /// Resolves the schema node addressed by `path`.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> Option<&SchemaNode> {
        path.identifiers()
            .iter()
            .try_fold(self.root.as_ref(), |node, id| node.child(id))
    }
}
