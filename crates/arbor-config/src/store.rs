// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! [`StoreConfig`] persistence helpers.

use arbor_core::StoreConfig;
use tracing::debug;

use crate::config::{ConfigError, ConfigService, ConfigStore};

/// Key [`StoreConfig`] is conventionally stored under.
pub const STORE_CONFIG_KEY: &str = "store";

/// Loads the [`StoreConfig`] saved under `key`, or the default when none was
/// saved yet. Fields missing from the saved JSON take their default values.
///
/// A saved config with a blank store name is rejected with
/// [`ConfigError::Invalid`].
pub fn load_store_config<S: ConfigStore>(
    service: &ConfigService<S>,
    key: &str,
) -> Result<StoreConfig, ConfigError> {
    if let Some(config) = service.load::<StoreConfig>(key)? {
        check_store_config(key, &config)?;
        debug!(key, name = %config.name, "loaded store config");
        return Ok(config);
    }
    debug!(key, "no saved store config; using defaults");
    Ok(StoreConfig::default())
}

/// Saves `config` under `key`.
pub fn save_store_config<S: ConfigStore>(
    service: &ConfigService<S>,
    key: &str,
    config: &StoreConfig,
) -> Result<(), ConfigError> {
    check_store_config(key, config)?;
    service.save(key, config)
}

fn check_store_config(key: &str, config: &StoreConfig) -> Result<(), ConfigError> {
    if config.name.trim().is_empty() {
        return Err(ConfigError::Invalid {
            key: key.to_owned(),
            reason: "store name is blank".to_owned(),
        });
    }
    Ok(())
}
