// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Change listener that records every delivered candidate.

use std::sync::{Arc, Mutex, MutexGuard};

use arbor_core::{DataTreeCandidate, DataTreeChangeListener, Path, Version};

/// Listener recording candidates in delivery order. Clones share the log,
/// so keep one clone in the test and register the other.
#[derive(Clone, Default)]
pub struct RecordingListener {
    seen: Arc<Mutex<Vec<DataTreeCandidate>>>,
}

impl RecordingListener {
    /// Create a listener with an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<DataTreeCandidate>> {
        self.seen.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Copies of every candidate received so far.
    pub fn candidates(&self) -> Vec<DataTreeCandidate> {
        self.lock().clone()
    }

    /// Number of candidates received.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` when nothing was delivered yet.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// `after_version` of each candidate, in delivery order.
    pub fn versions(&self) -> Vec<Version> {
        self.lock().iter().map(DataTreeCandidate::after_version).collect()
    }

    /// Changed paths of the most recent candidate.
    pub fn last_changed_paths(&self) -> Option<Vec<Path>> {
        self.lock().last().map(DataTreeCandidate::changed_paths)
    }

    /// Forget everything received so far.
    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl DataTreeChangeListener for RecordingListener {
    fn on_data_tree_changed(&self, candidate: &DataTreeCandidate) {
        self.lock().push(candidate.clone());
    }
}
