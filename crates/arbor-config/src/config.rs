// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Config service and storage port.
//!
//! Keys name one saved config each (typically one per store) and double as
//! file stems in [`FsConfigStore`](crate::FsConfigStore), so the service
//! only accepts ASCII letters, digits, `-`, `_` and inner dots.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Storage port for raw config blobs (keyed by logical name).
pub trait ConfigStore {
    /// Load a raw config blob. Returns `NotFound` when missing.
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError>;
    /// Persist a raw config blob.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError>;
}

impl<S: ConfigStore + ?Sized> ConfigStore for &S {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        (**self).load_raw(key)
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        (**self).save_raw(key, data)
    }
}

/// Error type for config operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Key not present in store.
    #[error("not found")]
    NotFound,
    /// Key cannot name a config.
    #[error("invalid config key {0:?}")]
    InvalidKey(String),
    /// I/O error while reading/writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Blob under `key` is not the expected JSON.
    #[error("config {key:?} is not valid JSON: {source}")]
    Serde {
        /// Key being loaded or saved.
        key: String,
        /// Underlying decode or encode failure.
        #[source]
        source: serde_json::Error,
    },
    /// Decoded config breaks a rule of its type.
    #[error("config {key:?} rejected: {reason}")]
    Invalid {
        /// Key the config was loaded from or saved to.
        key: String,
        /// Broken rule.
        reason: String,
    },
    /// Catch-all error variant.
    #[error("other: {0}")]
    Other(String),
}

fn check_key(key: &str) -> Result<(), ConfigError> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.');
    if key.is_empty() || key.starts_with('.') || key.ends_with('.') || !key.chars().all(allowed) {
        return Err(ConfigError::InvalidKey(key.to_owned()));
    }
    Ok(())
}

/// Serializes config values as JSON and delegates storage to a [`ConfigStore`].
pub struct ConfigService<S> {
    store: S,
}

impl<S> ConfigService<S> {
    /// Create a new service using the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Borrow the inner store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Consume the service and return the inner store.
    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S> ConfigService<S>
where
    S: ConfigStore,
{
    /// Load and deserialize the value stored under `key`.
    ///
    /// A missing key and an empty blob both yield `Ok(None)`.
    pub fn load<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: DeserializeOwned,
    {
        check_key(key)?;
        match self.store.load_raw(key) {
            Ok(bytes) if bytes.is_empty() => Ok(None),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|source| ConfigError::Serde {
                    key: key.to_owned(),
                    source,
                }),
            Err(ConfigError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Like [`load`](Self::load), falling back to `T::default()`.
    pub fn load_or_default<T>(&self, key: &str) -> Result<T, ConfigError>
    where
        T: DeserializeOwned + Default,
    {
        Ok(self.load(key)?.unwrap_or_default())
    }

    /// Serialize `value` as pretty JSON and persist it under `key`.
    pub fn save<T>(&self, key: &str, value: &T) -> Result<(), ConfigError>
    where
        T: Serialize,
    {
        check_key(key)?;
        let data = serde_json::to_vec_pretty(value).map_err(|source| ConfigError::Serde {
            key: key.to_owned(),
            source,
        })?;
        self.store.save_raw(key, &data)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MapStore(RefCell<HashMap<String, Vec<u8>>>);

    impl ConfigStore for MapStore {
        fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
            self.0.borrow().get(key).cloned().ok_or(ConfigError::NotFound)
        }

        fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
            self.0.borrow_mut().insert(key.to_owned(), data.to_vec());
            Ok(())
        }
    }

    #[test]
    fn missing_key_loads_as_none() {
        let service = ConfigService::new(MapStore::default());
        let loaded: Option<u32> = service.load("absent").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn empty_blob_loads_as_none() {
        let store = MapStore::default();
        store.save_raw("blank", b"").unwrap();
        let service = ConfigService::new(store);
        let loaded: Option<u32> = service.load("blank").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn saved_json_is_pretty_printed() {
        let service = ConfigService::new(MapStore::default());
        let mut value = HashMap::new();
        value.insert("name", "primary");
        service.save("prefs", &value).unwrap();
        let raw = service.store().load_raw("prefs").unwrap();
        assert_eq!(String::from_utf8(raw).unwrap(), "{\n  \"name\": \"primary\"\n}");
    }

    #[test]
    fn malformed_blob_is_a_serde_error() {
        let store = MapStore::default();
        store.save_raw("broken", b"{not json").unwrap();
        let service = ConfigService::new(&store);
        let res: Result<Option<u32>, _> = service.load("broken");
        assert!(
            matches!(res, Err(ConfigError::Serde { ref key, .. }) if key == "broken"),
            "got {res:?}"
        );
    }

    #[test]
    fn keys_that_cannot_be_file_stems_are_rejected() {
        let service = ConfigService::new(MapStore::default());
        for key in ["", "../escape", "a/b", ".hidden", "trailing.", "sp ace"] {
            assert!(
                matches!(service.save(key, &1u32), Err(ConfigError::InvalidKey(_))),
                "{key:?} accepted"
            );
            let res: Result<Option<u32>, _> = service.load(key);
            assert!(matches!(res, Err(ConfigError::InvalidKey(_))));
        }
        assert!(service.save("store.primary", &1u32).is_ok());
        assert!(service.store().0.borrow().contains_key("store.primary"));
    }

    #[test]
    fn load_or_default_fills_missing_keys() {
        let service = ConfigService::new(MapStore::default());
        service.save("count", &7u32).unwrap();
        assert_eq!(service.load_or_default::<u32>("count").unwrap(), 7);
        assert_eq!(service.load_or_default::<u32>("absent").unwrap(), 0);
    }
}
