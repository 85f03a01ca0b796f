// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! [`NodeStreamWriter`] that records the walker's events.

use arbor_core::{NodeIdentifier, NodeStreamWriter, Value};

/// One event emitted by [`arbor_core::write_node`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEvent {
    /// `start_container(id, child_count)`
    Container(NodeIdentifier, usize),
    /// `start_list(id, child_count)`
    List(NodeIdentifier, usize),
    /// `start_list_entry(id, child_count)`
    ListEntry(NodeIdentifier, usize),
    /// `start_leaf_set(id, child_count)`
    LeafSet(NodeIdentifier, usize),
    /// `start_choice(id, child_count)`
    Choice(NodeIdentifier, usize),
    /// `start_augmentation(id, child_count)`
    Augmentation(NodeIdentifier, usize),
    /// `leaf(id, value)`
    Leaf(NodeIdentifier, Value),
    /// `leaf_set_entry(id, value)`
    LeafSetEntry(NodeIdentifier, Value),
    /// `end_node()`
    End,
}

/// Collects [`StreamEvent`]s and tracks nesting depth.
#[derive(Debug, Default)]
pub struct RecordingWriter {
    /// Events in emission order.
    pub events: Vec<StreamEvent>,
    depth: usize,
    max_depth: usize,
}

impl RecordingWriter {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when every start was matched by an end.
    pub fn is_balanced(&self) -> bool {
        self.depth == 0
    }

    /// Deepest composite nesting seen.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Names of the leaves in emission order.
    pub fn leaf_names(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|event| match event {
                StreamEvent::Leaf(id, _) => Some(id.to_string()),
                _ => None,
            })
            .collect()
    }

    fn open(&mut self, event: StreamEvent) {
        self.events.push(event);
        self.depth += 1;
        self.max_depth = self.max_depth.max(self.depth);
    }
}

impl NodeStreamWriter for RecordingWriter {
    fn start_container(&mut self, id: &NodeIdentifier, child_count: usize) {
        self.open(StreamEvent::Container(id.clone(), child_count));
    }

    fn start_list(&mut self, id: &NodeIdentifier, child_count: usize) {
        self.open(StreamEvent::List(id.clone(), child_count));
    }

    fn start_list_entry(&mut self, id: &NodeIdentifier, child_count: usize) {
        self.open(StreamEvent::ListEntry(id.clone(), child_count));
    }

    fn start_leaf_set(&mut self, id: &NodeIdentifier, child_count: usize) {
        self.open(StreamEvent::LeafSet(id.clone(), child_count));
    }

    fn start_choice(&mut self, id: &NodeIdentifier, child_count: usize) {
        self.open(StreamEvent::Choice(id.clone(), child_count));
    }

    fn start_augmentation(&mut self, id: &NodeIdentifier, child_count: usize) {
        self.open(StreamEvent::Augmentation(id.clone(), child_count));
    }

    fn leaf(&mut self, id: &NodeIdentifier, value: &Value) {
        self.events.push(StreamEvent::Leaf(id.clone(), value.clone()));
    }

    fn leaf_set_entry(&mut self, id: &NodeIdentifier, value: &Value) {
        self.events
            .push(StreamEvent::LeafSetEntry(id.clone(), value.clone()));
    }

    fn end_node(&mut self) {
        self.events.push(StreamEvent::End);
        self.depth = self.depth.saturating_sub(1);
    }
}
