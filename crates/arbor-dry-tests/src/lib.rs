// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for Arbor crates.
#![forbid(unsafe_code)]
//!
//! # Modules
//!
//! - [`config`] - In-memory config store fake for testing without filesystem
//! - [`listener`] - Change listener that records every delivered candidate
//! - [`schema`] - The canonical test schema plus matching path and node builders
//! - [`store`] - Store builder and one-call commit helpers
//! - [`stream`] - Stream writer that records walker events

pub mod config;
pub mod listener;
pub mod schema;
pub mod store;
pub mod stream;

// Re-export commonly used items at crate root for convenience
pub use config::InMemoryConfigStore;
pub use listener::RecordingListener;
pub use schema::{
    augmentation, augmentation_path, inner_entry, inner_entry_path, inner_list, inner_list_path,
    inner_value_path, outer_entry, outer_entry_path, outer_list, outer_list_path, tags_path,
    test_container, test_path, test_schema, transport_path,
};
pub use store::{commit, commit_delete, commit_merge, commit_write, StoreTestBuilder};
pub use stream::{RecordingWriter, StreamEvent};
