// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Operation resolver: per-schema-kind merge, child replacement and
//! structural validation.
//!
//! Dispatch is keyed by [`SchemaKind`], not by the data node's variant: list
//! entries and leaf-set entries are both children of a collection but merge
//! differently, and only the schema knows which is which.
use crate::error::ValidationError;
use crate::ident::{NodeIdentifier, QName};
use crate::node::{CompositeKind, DataNode, NodeData};
use crate::path::Path;
use crate::schema::{SchemaKey, SchemaKind, SchemaNode};

/// Returns `true` when the data payload has the shape `schema` requires.
pub(crate) fn kind_matches(schema: &SchemaKind, data: &NodeData) -> bool {
    match (schema, data) {
        (SchemaKind::Leaf, NodeData::Leaf(_))
        | (SchemaKind::LeafSetEntry, NodeData::LeafSetEntry(_)) => true,
        (SchemaKind::Leaf | SchemaKind::LeafSetEntry, _) => false,
        (_, NodeData::Composite { kind, .. }) => {
            composite_kind_for(schema).is_some_and(|expected| expected == *kind)
        }
        (_, _) => false,
    }
}

fn composite_kind_for(schema: &SchemaKind) -> Option<CompositeKind> {
    match schema {
        SchemaKind::Container => Some(CompositeKind::Container),
        SchemaKind::LeafSet => Some(CompositeKind::LeafSet),
        SchemaKind::List { .. } => Some(CompositeKind::List),
        SchemaKind::ListEntry { .. } => Some(CompositeKind::ListEntry),
        SchemaKind::Choice { .. } => Some(CompositeKind::Choice),
        SchemaKind::Augmentation => Some(CompositeKind::Augmentation),
        SchemaKind::Leaf | SchemaKind::LeafSetEntry => None,
    }
}

/// Shallow check applied eagerly on every write and merge: the node must be
/// addressed by the last component of `path` and have the schema's kind.
pub(crate) fn check_shape(
    schema: &SchemaNode,
    node: &DataNode,
    path: &Path,
) -> Result<(), ValidationError> {
    let expected = path.last().cloned().unwrap_or_else(NodeIdentifier::root);
    if node.identifier() != &expected {
        return Err(ValidationError::IdentifierMismatch {
            path: path.clone(),
            expected,
            actual: node.identifier().clone(),
        });
    }
    if !kind_matches(schema.kind(), node.data()) {
        return Err(ValidationError::KindMismatch {
            path: path.clone(),
            expected: schema.kind().label(),
        });
    }
    Ok(())
}

/// Combines `update` into `current` following the merge rule of `schema`.
///
/// Scalars are overwritten. Containers, augmentations, list entries, lists
/// and leaf-sets merge child by child: children only in `update` are added,
/// children in both are merged recursively, children only in `current` stay.
/// A choice whose update designates another case drops the active case.
pub(crate) fn merge(
    schema: &SchemaNode,
    current: &DataNode,
    update: &DataNode,
    path: &Path,
) -> Result<DataNode, ValidationError> {
    if !kind_matches(schema.kind(), current.data()) {
        // Stored node has a foreign shape: replace it.
        return Ok(update.clone());
    }
    match schema.kind() {
        SchemaKind::Leaf | SchemaKind::LeafSetEntry => Ok(update.clone()),
        SchemaKind::Container
        | SchemaKind::Augmentation
        | SchemaKind::ListEntry { .. }
        | SchemaKind::List { .. }
        | SchemaKind::LeafSet => merge_children(schema, current, update, path),
        SchemaKind::Choice { .. } => {
            let Some(incoming) = active_case(schema, update, path)? else {
                return Err(ValidationError::MissingChoiceCase { path: path.clone() });
            };
            match active_case(schema, current, path)? {
                Some(active) if active != incoming => Ok(update.clone()),
                _ => merge_children(schema, current, update, path),
            }
        }
    }
}

fn merge_children(
    schema: &SchemaNode,
    current: &DataNode,
    update: &DataNode,
    path: &Path,
) -> Result<DataNode, ValidationError> {
    let (Some(existing), Some(incoming)) = (current.children(), update.children()) else {
        return Ok(update.clone());
    };
    let mut merged = existing.clone();
    for (id, child) in incoming {
        let child_path = path.node(id.clone());
        let child_schema = schema
            .child(id)
            .ok_or_else(|| ValidationError::UnknownSchemaNode {
                path: child_path.clone(),
            })?;
        let next = match existing.get(id) {
            Some(old) => merge(child_schema, old, child, &child_path)?,
            None => child.clone(),
        };
        merged.insert(id.clone(), next);
    }
    Ok(update.with_children(merged))
}

/// Empty structural node created for an absent ancestor of a write target.
///
/// List entries receive their key leaves from the identifier. Scalars cannot
/// be ancestors and yield `None`.
pub(crate) fn structural_shell(schema: &SchemaNode, id: &NodeIdentifier) -> Option<DataNode> {
    let kind = composite_kind_for(schema.kind())?;
    if let (CompositeKind::ListEntry, NodeIdentifier::Entry { name, keys }) = (kind, id) {
        return Some(DataNode::list_entry(
            name.as_str(),
            keys.iter().map(|(k, v)| (k.clone(), v.clone())),
            [],
        ));
    }
    Some(DataNode::composite(id.clone(), kind, []))
}

/// `true` for a choice node with no children, which no schema accepts.
pub(crate) fn is_empty_choice(node: &DataNode) -> bool {
    matches!(
        node.data(),
        NodeData::Composite { kind: CompositeKind::Choice, children } if children.is_empty()
    )
}

/// Returns `parent` with child `id` replaced (or removed for `None`).
///
/// Under a choice, inserting a child deactivates every child belonging to
/// another case.
pub(crate) fn replace_child(
    schema: &SchemaNode,
    parent: &DataNode,
    parent_path: &Path,
    id: &NodeIdentifier,
    child: Option<DataNode>,
) -> Result<DataNode, ValidationError> {
    let (SchemaKind::Choice { .. }, Some(child)) = (schema.kind(), &child) else {
        return Ok(parent.with_child(id, child));
    };
    let case = schema
        .case_of(&SchemaKey::from(id))
        .ok_or_else(|| ValidationError::UnknownChoiceCase {
            path: parent_path.clone(),
            child: id.clone(),
        })?;
    let mut children = parent.children().cloned().unwrap_or_default();
    if let Some(members) = schema.case_members(case) {
        children.retain(|existing, _| members.contains(&SchemaKey::from(existing)));
    }
    children.insert(id.clone(), child.clone());
    Ok(parent.with_children(children))
}

/// Case designated by the children of a choice node.
///
/// `Ok(None)` for an empty choice.
pub(crate) fn active_case(
    schema: &SchemaNode,
    node: &DataNode,
    path: &Path,
) -> Result<Option<QName>, ValidationError> {
    let mut cases: Vec<QName> = Vec::new();
    for id in node.children().into_iter().flat_map(|c| c.keys()) {
        let case = schema
            .case_of(&SchemaKey::from(id))
            .ok_or_else(|| ValidationError::UnknownChoiceCase {
                path: path.clone(),
                child: id.clone(),
            })?;
        if !cases.contains(case) {
            cases.push(case.clone());
        }
    }
    match cases.len() {
        0 => Ok(None),
        1 => Ok(cases.pop()),
        _ => Err(ValidationError::AmbiguousChoice {
            path: path.clone(),
            cases,
        }),
    }
}

/// Checks that a list entry carries every declared key, that each key leaf
/// agrees with the entry identifier, and that the identifier names only
/// declared keys.
pub(crate) fn validate_entry_keys(
    keys: &[QName],
    entry: &DataNode,
    path: &Path,
) -> Result<(), ValidationError> {
    let NodeIdentifier::Entry { keys: id_keys, .. } = entry.identifier() else {
        return Err(ValidationError::KindMismatch {
            path: path.clone(),
            expected: SchemaKind::ListEntry { keys: Vec::new() }.label(),
        });
    };
    for key in keys {
        let missing = || ValidationError::MissingKey {
            path: path.clone(),
            key: key.clone(),
        };
        let expected = id_keys.get(key).ok_or_else(missing)?;
        let leaf = entry
            .child(&NodeIdentifier::Name(key.clone()))
            .ok_or_else(missing)?;
        if leaf.value() != Some(expected) {
            return Err(ValidationError::KeyMismatch {
                path: path.clone(),
                key: key.clone(),
            });
        }
    }
    if let Some(extra) = id_keys.keys().find(|k| !keys.contains(k)) {
        return Err(ValidationError::KeyMismatch {
            path: path.clone(),
            key: extra.clone(),
        });
    }
    Ok(())
}

/// Full structural validation of the subtree at `path`.
pub(crate) fn validate(
    schema: &SchemaNode,
    node: &DataNode,
    path: &Path,
) -> Result<(), ValidationError> {
    if !kind_matches(schema.kind(), node.data()) {
        return Err(ValidationError::KindMismatch {
            path: path.clone(),
            expected: schema.kind().label(),
        });
    }
    match schema.kind() {
        SchemaKind::ListEntry { keys } => validate_entry_keys(keys, node, path)?,
        SchemaKind::Choice { .. } => {
            if active_case(schema, node, path)?.is_none() {
                return Err(ValidationError::MissingChoiceCase { path: path.clone() });
            }
        }
        SchemaKind::LeafSetEntry => {
            if let (NodeIdentifier::LeafValue { name, value }, Some(held)) =
                (node.identifier(), node.value())
            {
                if held != value {
                    return Err(ValidationError::IdentifierMismatch {
                        path: path.clone(),
                        expected: NodeIdentifier::LeafValue {
                            name: name.clone(),
                            value: held.clone(),
                        },
                        actual: node.identifier().clone(),
                    });
                }
            }
        }
        SchemaKind::Container
        | SchemaKind::Leaf
        | SchemaKind::LeafSet
        | SchemaKind::List { .. }
        | SchemaKind::Augmentation => {}
    }
    for (id, child) in node.children().into_iter().flatten() {
        let child_path = path.node(id.clone());
        if child.identifier() != id {
            return Err(ValidationError::IdentifierMismatch {
                path: child_path,
                expected: id.clone(),
                actual: child.identifier().clone(),
            });
        }
        let child_schema = schema
            .child(id)
            .ok_or_else(|| ValidationError::UnknownSchemaNode {
                path: child_path.clone(),
            })?;
        validate(child_schema, child, &child_path)?;
    }
    Ok(())
}
