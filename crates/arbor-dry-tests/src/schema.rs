// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The canonical test schema and builders for paths and nodes inside it.
//!
//! ```text
//! test                      container
//! ├── outer-list [id]       list
//! │   ├── id                leaf
//! │   └── inner-list [name] list
//! │       ├── name          leaf
//! │       └── value         leaf
//! ├── tags                  leaf-set
//! ├── transport             choice: tcp { tcp-port } | udp { udp-port, udp-ttl }
//! ├── description           leaf
//! └── (augmentation)        ext-flag, ext-note
//! ```

use arbor_core::{DataNode, NodeIdentifier, Path, SchemaModel, SchemaNode};

/// Top-level container.
pub const TEST: &str = "test";
/// Outer keyed list.
pub const OUTER_LIST: &str = "outer-list";
/// Key leaf of `outer-list`.
pub const ID: &str = "id";
/// Inner keyed list below each outer entry.
pub const INNER_LIST: &str = "inner-list";
/// Key leaf of `inner-list`.
pub const NAME: &str = "name";
/// Payload leaf of inner entries.
pub const VALUE: &str = "value";
/// Leaf-set below `test`.
pub const TAGS: &str = "tags";
/// Choice below `test`.
pub const TRANSPORT: &str = "transport";
/// Plain leaf below `test`.
pub const DESCRIPTION: &str = "description";
/// Augmentation members below `test`.
pub const EXT_FLAG: &str = "ext-flag";
/// Augmentation members below `test`.
pub const EXT_NOTE: &str = "ext-note";

/// Builds the test schema.
pub fn test_schema() -> SchemaModel {
    SchemaModel::new([SchemaNode::container(
        TEST,
        [
            SchemaNode::list(
                OUTER_LIST,
                &[ID],
                [
                    SchemaNode::leaf(ID),
                    SchemaNode::list(
                        INNER_LIST,
                        &[NAME],
                        [SchemaNode::leaf(NAME), SchemaNode::leaf(VALUE)],
                    ),
                ],
            ),
            SchemaNode::leaf_set(TAGS),
            SchemaNode::choice(
                TRANSPORT,
                [
                    ("tcp", vec![SchemaNode::leaf("tcp-port")]),
                    (
                        "udp",
                        vec![SchemaNode::leaf("udp-port"), SchemaNode::leaf("udp-ttl")],
                    ),
                ],
            ),
            SchemaNode::leaf(DESCRIPTION),
            SchemaNode::augmentation([SchemaNode::leaf(EXT_FLAG), SchemaNode::leaf(EXT_NOTE)]),
        ],
    )])
}

/// `/test`
pub fn test_path() -> Path {
    Path::root().child(TEST)
}

/// `/test/outer-list`
pub fn outer_list_path() -> Path {
    test_path().child(OUTER_LIST)
}

/// `/test/outer-list/outer-list[id=<id>]`
pub fn outer_entry_path(id: i64) -> Path {
    outer_list_path().entry(OUTER_LIST, [(ID, id)])
}

/// `/test/outer-list/outer-list[id=<id>]/inner-list`
pub fn inner_list_path(id: i64) -> Path {
    outer_entry_path(id).child(INNER_LIST)
}

/// `/test/outer-list/outer-list[id=<id>]/inner-list/inner-list[name=<name>]`
pub fn inner_entry_path(id: i64, name: &str) -> Path {
    inner_list_path(id).entry(INNER_LIST, [(NAME, name)])
}

/// `.../inner-list[name=<name>]/value`
pub fn inner_value_path(id: i64, name: &str) -> Path {
    inner_entry_path(id, name).child(VALUE)
}

/// `/test/tags`
pub fn tags_path() -> Path {
    test_path().child(TAGS)
}

/// `/test/transport`
pub fn transport_path() -> Path {
    test_path().child(TRANSPORT)
}

/// `/test/(ext-flag, ext-note)`
pub fn augmentation_path() -> Path {
    test_path().node(NodeIdentifier::augmentation([EXT_FLAG, EXT_NOTE]))
}

/// `test` container holding `children`.
pub fn test_container(children: impl IntoIterator<Item = DataNode>) -> DataNode {
    DataNode::container(TEST, children)
}

/// `outer-list` holding `entries`.
pub fn outer_list(entries: impl IntoIterator<Item = DataNode>) -> DataNode {
    DataNode::list(OUTER_LIST, entries)
}

/// Outer entry `id`; an `inner-list` is added when `inner` is non-empty.
pub fn outer_entry(id: i64, inner: impl IntoIterator<Item = DataNode>) -> DataNode {
    let inner: Vec<DataNode> = inner.into_iter().collect();
    let children = if inner.is_empty() {
        Vec::new()
    } else {
        vec![inner_list(inner)]
    };
    DataNode::list_entry(OUTER_LIST, [(ID, id)], children)
}

/// `inner-list` holding `entries`.
pub fn inner_list(entries: impl IntoIterator<Item = DataNode>) -> DataNode {
    DataNode::list(INNER_LIST, entries)
}

/// The `test` augmentation holding `children`.
pub fn augmentation(children: impl IntoIterator<Item = DataNode>) -> DataNode {
    DataNode::augmentation(&[EXT_FLAG, EXT_NOTE], children)
}

/// Inner entry `name` carrying `value`.
pub fn inner_entry(name: &str, value: &str) -> DataNode {
    DataNode::list_entry(INNER_LIST, [(NAME, name)], [DataNode::leaf(VALUE, value)])
}
