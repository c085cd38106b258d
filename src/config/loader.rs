// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::model::ConfigFile;
use crate::config::validate::validate_config;

/// Load a configuration file and return the raw `ConfigFile`.
///
/// This only performs TOML deserialization; semantic validation (ordering
/// acyclicity, reference checks) lives in [`load_and_validate`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading config file at {:?}", path))?;

    let config: ConfigFile = toml::from_str(&contents)
        .with_context(|| format!("parsing TOML config from {:?}", path))?;

    Ok(config)
}

/// Load a configuration file and run semantic validation.
///
/// This is the entry point the rest of the application uses:
/// - Reads TOML; defaults are applied by `serde` + `Default` impls.
/// - Checks unknown `after` / `parallel_with` references.
/// - Rejects ordering cycles.
/// - Checks per-action sanity (non-empty pattern lists, valid targets).
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let config = load_from_path(&path)?;
    validate_config(&config)?;
    Ok(config)
}

/// Default config path: `Sitegear.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Sitegear.toml")
}
