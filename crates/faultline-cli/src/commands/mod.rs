//! CLI subcommands

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use faultline_core::config::Config;
use faultline_telemetry::{FileStateStorage, LocalLogStore};

pub mod capture;
pub mod config;
pub mod local;
pub mod remote;

/// Loads the configuration and returns it with the path it came from.
///
/// An explicit path must exist and parse; the default path falls back to
/// built-in defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<(Config, PathBuf)> {
    match explicit {
        Some(path) => {
            let config = Config::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            Ok((config, path.to_path_buf()))
        }
        None => {
            let path = Config::default_path();
            Ok((Config::load_or_default(&path), path))
        }
    }
}

/// Opens the persisted local log store described by `config`.
pub fn open_local_store(config: &Config) -> LocalLogStore {
    let storage = std::sync::Arc::new(FileStateStorage::new(config.pipeline.state_dir.clone()));
    let mut store = LocalLogStore::new(
        storage,
        config.pipeline.storage_key.clone(),
        config.pipeline.store_capacity,
    );
    store.load();
    store
}
