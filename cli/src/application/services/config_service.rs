//! Application service: configuration use-cases.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::application::ports::ConfigStore;
use crate::domain::config::{SiteforgeConfig, validate_config};

/// Load configuration and check it is usable.
///
/// # Errors
///
/// Returns an error if the file cannot be parsed or holds invalid values.
pub fn load_config(store: &impl ConfigStore) -> Result<SiteforgeConfig> {
    let config = store.load()?;
    let path = store.path().unwrap_or_default();
    validate_config(&config).with_context(|| format!("invalid configuration in {}", path.display()))?;
    Ok(config)
}

/// Where the configuration is read from.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn config_path(store: &impl ConfigStore) -> Result<PathBuf> {
    store.path()
}
