// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Configuration plumbing for Arbor stores.
//!
//! [`ConfigStore`] is the storage port for raw config blobs,
//! [`ConfigService`] (de)serializes typed values as JSON on top of it and
//! [`FsConfigStore`] keeps the blobs as `<key>.json` files under a directory.
//! [`load_store_config`] and [`save_store_config`] wire
//! [`arbor_core::StoreConfig`] through the service.
#![forbid(unsafe_code)]

mod config;
mod fs;
mod store;

pub use config::{ConfigError, ConfigService, ConfigStore};
pub use fs::FsConfigStore;
pub use store::{load_store_config, save_store_config, STORE_CONFIG_KEY};
