// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Absolute addresses of nodes in the tree.
use std::fmt;

use crate::ident::{NodeIdentifier, QName, Value};

/// Ordered sequence of [`NodeIdentifier`]s leading from the root to a node.
///
/// The empty path addresses the root container. Ordering is lexicographic
/// over the identifiers, so an ancestor always sorts before its descendants.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Path(Vec<NodeIdentifier>);

impl Path {
    /// The root path.
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Builds a path from its identifiers.
    pub fn from_identifiers(ids: impl IntoIterator<Item = NodeIdentifier>) -> Self {
        Self(ids.into_iter().collect())
    }

    /// Returns a new path extended by `id`.
    #[must_use]
    pub fn node(&self, id: NodeIdentifier) -> Self {
        let mut next = self.0.clone();
        next.push(id);
        Self(next)
    }

    /// Returns a new path extended by a plainly named child.
    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        self.node(NodeIdentifier::name(name))
    }

    /// Returns a new path extended by a keyed list entry.
    pub fn entry<K, V>(&self, list: &str, keys: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<QName>,
        V: Into<Value>,
    {
        self.node(NodeIdentifier::entry(list, keys))
    }

    /// Returns a new path extended by a leaf-set entry.
    pub fn leaf_value(&self, leaf_set: &str, value: impl Into<Value>) -> Self {
        self.node(NodeIdentifier::leaf_value(leaf_set, value))
    }

    /// Returns `true` for the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of identifiers in the path.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for the root path.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Identifiers from the root downwards.
    #[must_use]
    pub fn identifiers(&self) -> &[NodeIdentifier] {
        &self.0
    }

    /// Last identifier, `None` for the root.
    #[must_use]
    pub fn last(&self) -> Option<&NodeIdentifier> {
        self.0.last()
    }

    /// Parent path, `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let (_, head) = self.0.split_last()?;
        Some(Self(head.to_vec()))
    }

    /// Returns `true` when `prefix` is `self` or one of its ancestors.
    #[must_use]
    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Returns `true` when `self` is a strict ancestor of `other`.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        self.0.len() < other.0.len() && other.starts_with(self)
    }

    /// Iterates over every ancestor path from the root down to (and
    /// including) `self`.
    pub fn ancestors_and_self(&self) -> impl Iterator<Item = Path> + '_ {
        (0..=self.0.len()).map(|len| Self(self.0[..len].to_vec()))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for id in &self.0 {
            write!(f, "/{id}")?;
        }
        Ok(())
    }
}

impl FromIterator<NodeIdentifier> for Path {
    fn from_iter<T: IntoIterator<Item = NodeIdentifier>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_slash_notation() {
        let path = Path::root()
            .child("test")
            .child("outer-list")
            .entry("outer-list", [("id", 2)]);
        assert_eq!(path.to_string(), "/test/outer-list/outer-list[id=2]");
        assert_eq!(Path::root().to_string(), "/");
    }

    #[test]
    fn ancestry_is_prefix_based() {
        let test = Path::root().child("test");
        let deep = test.child("outer-list");
        assert!(test.is_ancestor_of(&deep));
        assert!(!deep.is_ancestor_of(&test));
        assert!(!test.is_ancestor_of(&test));
        assert!(test.starts_with(&test));
        assert!(deep.starts_with(&test));
        assert_eq!(deep.parent(), Some(test));
        assert_eq!(Path::root().parent(), None);
    }

    #[test]
    fn ancestors_sort_before_descendants() {
        let test = Path::root().child("test");
        let deep = test.child("a");
        assert!(test < deep);
        assert!(Path::root() < test);
    }

    #[test]
    fn ancestors_and_self_walks_from_root() {
        let deep = Path::root().child("a").child("b");
        let chain: Vec<String> = deep.ancestors_and_self().map(|p| p.to_string()).collect();
        assert_eq!(chain, vec!["/", "/a", "/a/b"]);
    }
}
