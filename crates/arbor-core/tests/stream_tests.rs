// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs, clippy::unwrap_used, clippy::panic)]
use arbor_core::{write_node, DataNode, NodeIdentifier, Value, ValidationError};
use arbor_dry_tests::schema::{DESCRIPTION, EXT_FLAG, TAGS, TRANSPORT};
use arbor_dry_tests::{
    augmentation, commit_write, outer_entry, outer_list, test_container, test_path,
    RecordingWriter, StoreTestBuilder, StreamEvent,
};

fn position(writer: &RecordingWriter, wanted: impl Fn(&StreamEvent) -> bool) -> usize {
    writer
        .events
        .iter()
        .position(wanted)
        .unwrap_or_else(|| panic!("event missing from {:?}", writer.events))
}

#[test]
fn committed_tree_streams_in_schema_order() {
    let store = StoreTestBuilder::new().build().unwrap();
    // Children handed over in reverse schema order.
    commit_write(
        &store,
        &test_path(),
        test_container([
            augmentation([DataNode::leaf(EXT_FLAG, true)]),
            DataNode::leaf(DESCRIPTION, "d"),
            DataNode::choice(TRANSPORT, [DataNode::leaf("tcp-port", 80u64)]),
            DataNode::leaf_set(TAGS, ["b", "a"]),
            outer_list([outer_entry(2, []), outer_entry(1, [])]),
        ]),
    )
    .unwrap();

    let snapshot = store.snapshot();
    let mut writer = RecordingWriter::new();
    write_node(store.schema().root(), snapshot.root_data(), &mut writer).unwrap();

    assert!(writer.is_balanced());
    assert_eq!(writer.events.last(), Some(&StreamEvent::End));
    let list = position(&writer, |e| matches!(e, StreamEvent::List(..)));
    let set = position(&writer, |e| matches!(e, StreamEvent::LeafSet(..)));
    let choice = position(&writer, |e| matches!(e, StreamEvent::Choice(..)));
    let description = position(&writer, |e| {
        matches!(e, StreamEvent::Leaf(id, _) if *id == NodeIdentifier::name(DESCRIPTION))
    });
    let aug = position(&writer, |e| matches!(e, StreamEvent::Augmentation(..)));
    assert!(list < set && set < choice && choice < description && description < aug);

    let entries: Vec<&NodeIdentifier> = writer
        .events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::ListEntry(id, _) => Some(id),
            _ => None,
        })
        .collect();
    assert_eq!(
        entries,
        vec![
            &NodeIdentifier::entry("outer-list", [("id", 1)]),
            &NodeIdentifier::entry("outer-list", [("id", 2)]),
        ]
    );
    let tags: Vec<&Value> = writer
        .events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::LeafSetEntry(_, v) => Some(v),
            _ => None,
        })
        .collect();
    assert_eq!(tags, vec![&Value::from("a"), &Value::from("b")]);
    // root, test, outer-list, entry
    assert_eq!(writer.max_depth(), 4);
}

#[test]
fn data_unknown_to_the_schema_is_rejected() {
    let store = StoreTestBuilder::new().build().unwrap();
    let stray = DataNode::root([DataNode::container("stray", [])]);
    let mut writer = RecordingWriter::new();
    let res = write_node(store.schema().root(), &stray, &mut writer);
    assert!(matches!(res, Err(ValidationError::UnknownSchemaNode { .. })));
}
