// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Store configuration.

/// Tunables for one [`DataStore`](crate::DataStore).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StoreConfig {
    /// Name carried by the store's tracing spans.
    pub name: String,
    /// Emit a `trace` event for every staged write, merge and delete.
    pub debug_transactions: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: "default".to_owned(),
            debug_transactions: false,
        }
    }
}

impl StoreConfig {
    /// Default configuration with a custom store name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}
