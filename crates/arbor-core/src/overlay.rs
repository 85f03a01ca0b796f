// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-transaction modification overlay.
//!
//! The overlay keeps two views of the staged changes:
//! - a materialized working root, derived from the base snapshot by copying
//!   only the shells of ancestors on each written path, which answers reads;
//! - an ordered operation log, which is replayed against the current
//!   snapshot when the transaction pre-commits.
//!
//! A write or delete at `P` supersedes every earlier entry at or below `P`,
//! so the log stays proportional to the number of distinct subtrees touched.
use std::sync::Arc;

use crate::error::ValidationError;
use crate::node::DataNode;
use crate::path::Path;
use crate::resolver;
use crate::schema::{SchemaKind, SchemaModel, SchemaNode};
use crate::snapshot::Snapshot;
use crate::tx::Version;

/// One staged operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Modification {
    /// Replace the subtree wholesale.
    Write(DataNode),
    /// Combine with the current subtree.
    Merge(DataNode),
    /// Remove the subtree.
    Delete,
}

impl Modification {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::Write(_) => "write",
            Self::Merge(_) => "merge",
            Self::Delete => "delete",
        }
    }
}

/// Applies one operation to `root`, returning the new root.
pub(crate) fn apply(
    schema: &SchemaModel,
    root: &DataNode,
    path: &Path,
    op: &Modification,
) -> Result<DataNode, ValidationError> {
    let target = schema
        .resolve(path)
        .ok_or_else(|| ValidationError::UnknownSchemaNode { path: path.clone() })?;
    match op {
        Modification::Write(node) => {
            resolver::check_shape(target, node, path)?;
            replace_at(schema.root(), root, path, 0, Some(node.clone()))
        }
        Modification::Merge(node) => {
            resolver::check_shape(target, node, path)?;
            let merged = match root.find(path) {
                Some(current) => resolver::merge(target, current, node, path)?,
                None => node.clone(),
            };
            replace_at(schema.root(), root, path, 0, Some(merged))
        }
        Modification::Delete => {
            if root.find(path).is_none() {
                return Ok(root.clone());
            }
            replace_at(schema.root(), root, path, 0, None)
        }
    }
}

fn replace_at(
    schema: &SchemaNode,
    node: &DataNode,
    path: &Path,
    depth: usize,
    new: Option<DataNode>,
) -> Result<DataNode, ValidationError> {
    let ids = path.identifiers();
    let Some(id) = ids.get(depth) else {
        return Ok(new.unwrap_or_else(DataNode::empty_root));
    };
    let here = Path::from_identifiers(ids[..depth].iter().cloned());
    if depth + 1 == ids.len() {
        return resolver::replace_child(schema, node, &here, id, new);
    }
    let unknown = || ValidationError::UnknownSchemaNode {
        path: here.node(id.clone()),
    };
    let child_schema = schema.child(id).ok_or_else(unknown)?;
    let child = match node.child(id) {
        Some(existing) => existing.clone(),
        None => resolver::structural_shell(child_schema, id).ok_or_else(unknown)?,
    };
    let deleting = new.is_none();
    let updated = replace_at(child_schema, &child, path, depth + 1, new)?;
    // A choice left without a case member is dropped with it.
    let updated = if deleting && resolver::is_empty_choice(&updated) {
        None
    } else {
        Some(updated)
    };
    resolver::replace_child(schema, node, &here, id, updated)
}

/// Staged, uncommitted changes of one transaction.
#[derive(Debug, Clone)]
pub(crate) struct Overlay {
    base: Arc<Snapshot>,
    root: DataNode,
    log: Vec<(Path, Modification)>,
}

impl Overlay {
    pub(crate) fn new(base: Arc<Snapshot>) -> Self {
        let root = base.root_data().clone();
        Self {
            base,
            root,
            log: Vec::new(),
        }
    }

    pub(crate) fn base(&self) -> &Arc<Snapshot> {
        &self.base
    }

    pub(crate) fn base_version(&self) -> Version {
        self.base.version()
    }

    /// Working root with every staged operation applied.
    pub(crate) fn root(&self) -> &DataNode {
        &self.root
    }

    pub(crate) fn read(&self, path: &Path) -> Option<DataNode> {
        self.root.find(path).cloned()
    }

    pub(crate) fn write(&mut self, path: &Path, node: DataNode) -> Result<(), ValidationError> {
        self.record(path, Modification::Write(node))
    }

    pub(crate) fn merge(&mut self, path: &Path, node: DataNode) -> Result<(), ValidationError> {
        self.record(path, Modification::Merge(node))
    }

    /// Deleting an absent path records nothing.
    pub(crate) fn delete(&mut self, path: &Path) -> Result<(), ValidationError> {
        if self.root.find(path).is_none() {
            return Ok(());
        }
        self.record(path, Modification::Delete)
    }

    fn record(&mut self, path: &Path, op: Modification) -> Result<(), ValidationError> {
        self.root = apply(self.base.schema(), &self.root, path, &op)?;
        if !matches!(op, Modification::Merge(_)) {
            self.log.retain(|(logged, _)| !logged.starts_with(path));
        }
        self.log.push((path.clone(), op));
        Ok(())
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    pub(crate) fn operations(&self) -> impl Iterator<Item = (&Path, &Modification)> {
        self.log.iter().map(|(path, op)| (path, op))
    }

    /// Structural validation of every modified path and, for modified list
    /// entry children, of the enclosing entry's keys.
    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        let schema = self.base.schema();
        for (path, _) in &self.log {
            if let (Some(node_schema), Some(node)) = (schema.resolve(path), self.root.find(path)) {
                resolver::validate(node_schema, node, path)?;
            }
            let Some(parent_path) = path.parent() else {
                continue;
            };
            let (Some(parent_schema), Some(parent)) =
                (schema.resolve(&parent_path), self.root.find(&parent_path))
            else {
                continue;
            };
            if let SchemaKind::ListEntry { keys } = parent_schema.kind() {
                resolver::validate_entry_keys(keys, parent, &parent_path)?;
            }
        }
        Ok(())
    }

    /// Rebuilds the working root on top of `onto`.
    ///
    /// When `onto` is the base itself the materialized root is reused.
    pub(crate) fn replay(&self, onto: &Snapshot) -> Result<DataNode, ValidationError> {
        if DataNode::ptr_eq(onto.root_data(), self.base.root_data()) {
            return Ok(self.root.clone());
        }
        self.log
            .iter()
            .try_fold(onto.root_data().clone(), |root, (path, op)| {
                apply(onto.schema(), &root, path, op)
            })
    }
}
