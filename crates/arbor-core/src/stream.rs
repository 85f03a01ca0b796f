// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Schema-ordered streaming of data trees.
//!
//! [`write_node`] walks a data node and reports it to a [`NodeStreamWriter`]
//! with children in schema declaration order; entries of one list or
//! leaf-set come out in identifier order. Encoding the events into bytes is
//! the writer's business.
use crate::error::ValidationError;
use crate::ident::{NodeIdentifier, Value};
use crate::node::{CompositeKind, DataNode, NodeData};
use crate::path::Path;
use crate::resolver::kind_matches;
use crate::schema::{SchemaKey, SchemaNode};

/// Receives a depth-first event stream for one data tree.
///
/// Every `start_*` call is balanced by one [`end_node`](Self::end_node).
/// `child_count` is the number of direct children that follow.
pub trait NodeStreamWriter {
    /// Opens a container.
    fn start_container(&mut self, id: &NodeIdentifier, child_count: usize);
    /// Opens a keyed list.
    fn start_list(&mut self, id: &NodeIdentifier, child_count: usize);
    /// Opens one list entry.
    fn start_list_entry(&mut self, id: &NodeIdentifier, child_count: usize);
    /// Opens a leaf-set.
    fn start_leaf_set(&mut self, id: &NodeIdentifier, child_count: usize);
    /// Opens a choice.
    fn start_choice(&mut self, id: &NodeIdentifier, child_count: usize);
    /// Opens an augmentation.
    fn start_augmentation(&mut self, id: &NodeIdentifier, child_count: usize);
    /// Emits a scalar leaf.
    fn leaf(&mut self, id: &NodeIdentifier, value: &Value);
    /// Emits a leaf-set entry.
    fn leaf_set_entry(&mut self, id: &NodeIdentifier, value: &Value);
    /// Closes the innermost open composite.
    fn end_node(&mut self);
}

/// Streams `node`, described by `schema`, into `writer`.
///
/// # Errors
/// [`ValidationError::UnknownSchemaNode`] for a child the schema does not
/// declare, [`ValidationError::KindMismatch`] for a node whose shape differs
/// from its schema. Events already emitted are not retracted.
pub fn write_node<W>(schema: &SchemaNode, node: &DataNode, writer: &mut W) -> Result<(), ValidationError>
where
    W: NodeStreamWriter + ?Sized,
{
    let path = match node.identifier() {
        id if *id == NodeIdentifier::root() => Path::root(),
        id => Path::root().node(id.clone()),
    };
    walk(schema, node, &path, writer)
}

fn walk<W>(schema: &SchemaNode, node: &DataNode, path: &Path, writer: &mut W) -> Result<(), ValidationError>
where
    W: NodeStreamWriter + ?Sized,
{
    if !kind_matches(schema.kind(), node.data()) {
        return Err(ValidationError::KindMismatch {
            path: path.clone(),
            expected: schema.kind().label(),
        });
    }
    let id = node.identifier();
    let (kind, children) = match node.data() {
        NodeData::Leaf(value) => {
            writer.leaf(id, value);
            return Ok(());
        }
        NodeData::LeafSetEntry(value) => {
            writer.leaf_set_entry(id, value);
            return Ok(());
        }
        NodeData::Composite { kind, children } => (*kind, children),
    };

    let mut ordered = Vec::with_capacity(children.len());
    for (child_id, child) in children.iter() {
        let child_schema = schema
            .child(child_id)
            .ok_or_else(|| ValidationError::UnknownSchemaNode {
                path: path.node(child_id.clone()),
            })?;
        let position = schema
            .child_position(&SchemaKey::from(child_id))
            .unwrap_or(usize::MAX);
        ordered.push((position, child_id, child_schema, child));
    }
    // Stable sort keeps identifier order among entries sharing a position.
    ordered.sort_by_key(|(position, ..)| *position);

    match kind {
        CompositeKind::Container => writer.start_container(id, ordered.len()),
        CompositeKind::List => writer.start_list(id, ordered.len()),
        CompositeKind::ListEntry => writer.start_list_entry(id, ordered.len()),
        CompositeKind::LeafSet => writer.start_leaf_set(id, ordered.len()),
        CompositeKind::Choice => writer.start_choice(id, ordered.len()),
        CompositeKind::Augmentation => writer.start_augmentation(id, ordered.len()),
    }
    for (_, child_id, child_schema, child) in ordered {
        walk(child_schema, child, &path.node(child_id.clone()), writer)?;
    }
    writer.end_node();
    Ok(())
}
