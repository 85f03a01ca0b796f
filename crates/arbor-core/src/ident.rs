// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Names, scalar values and node identifiers.
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// Name of a schema node (container, leaf, list, ...).
///
/// Cloning is a reference-count bump; names are compared by content.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct QName(Arc<str>);

impl QName {
    /// Name carried by the root container of every tree.
    pub const ROOT: &'static str = "data";

    /// Creates a name from a label.
    #[must_use]
    pub fn new(label: &str) -> Self {
        Self(Arc::from(label))
    }

    /// Returns the root container name.
    #[must_use]
    pub fn root() -> Self {
        Self::new(Self::ROOT)
    }

    /// Returns the label as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QName {
    fn from(label: &str) -> Self {
        Self::new(label)
    }
}

/// Scalar value held by a leaf or a leaf-set entry.
///
/// Values are totally ordered so they can participate in list keys and
/// leaf-set entry identifiers.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// Presence-only leaf (`type empty`).
    Empty,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Unsigned integer.
    Uint(u64),
    /// UTF-8 string.
    String(String),
    /// Opaque bytes.
    Binary(Vec<u8>),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("()"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Uint(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
            Self::Binary(bytes) => {
                f.write_str("0x")?;
                for byte in bytes {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::Uint(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Binary(v)
    }
}

/// Address of one child within its parent.
///
/// Invariant: unique among the children of one parent. Entries of a keyed
/// list are told apart by their key values, entries of a leaf-set by their
/// value, and augmentations by the set of child names they contribute.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeIdentifier {
    /// Plain named child (container, leaf, list, leaf-set, choice).
    Name(QName),
    /// Keyed list entry; `name` is the list's own name.
    Entry {
        /// Name of the list the entry belongs to.
        name: QName,
        /// Key leaf name to key value.
        keys: BTreeMap<QName, Value>,
    },
    /// Leaf-set entry, addressed by its value.
    LeafValue {
        /// Name of the leaf-set the entry belongs to.
        name: QName,
        /// The entry's value.
        value: Value,
    },
    /// Augmentation marker: the set of child names the augmentation adds.
    Augmentation(BTreeSet<QName>),
}

impl NodeIdentifier {
    /// Plain named identifier.
    #[must_use]
    pub fn name(label: &str) -> Self {
        Self::Name(QName::new(label))
    }

    /// Identifier of the root container.
    #[must_use]
    pub fn root() -> Self {
        Self::Name(QName::root())
    }

    /// Keyed list entry identifier.
    pub fn entry<K, V>(list: &str, keys: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<QName>,
        V: Into<Value>,
    {
        Self::Entry {
            name: QName::new(list),
            keys: keys
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Leaf-set entry identifier.
    pub fn leaf_value(leaf_set: &str, value: impl Into<Value>) -> Self {
        Self::LeafValue {
            name: QName::new(leaf_set),
            value: value.into(),
        }
    }

    /// Augmentation identifier covering `children`.
    pub fn augmentation<'a>(children: impl IntoIterator<Item = &'a str>) -> Self {
        Self::Augmentation(children.into_iter().map(QName::new).collect())
    }

    /// Returns the schema name this identifier is bound to.
    ///
    /// Augmentations have no name of their own and return `None`.
    #[must_use]
    pub fn node_name(&self) -> Option<&QName> {
        match self {
            Self::Name(name) | Self::Entry { name, .. } | Self::LeafValue { name, .. } => {
                Some(name)
            }
            Self::Augmentation(_) => None,
        }
    }
}

impl fmt::Display for NodeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{name}"),
            Self::Entry { name, keys } => {
                write!(f, "{name}")?;
                for (key, value) in keys {
                    write!(f, "[{key}={value}]")?;
                }
                Ok(())
            }
            Self::LeafValue { name, value } => write!(f, "{name}[.={value}]"),
            Self::Augmentation(names) => {
                f.write_str("(augmentation")?;
                for name in names {
                    write!(f, " {name}")?;
                }
                f.write_str(")")
            }
        }
    }
}
