// src/config.rs

//! Configuration loading utilities.
//!
//! Reads the TOML file, overlays secrets from the environment and checks
//! the result before anything connects.

use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::Config;

/// Load, overlay and validate the configuration.
///
/// A missing file means defaults; an unreadable or invalid one is an error.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        Config::load(path)
            .map_err(|e| AppError::config(format!("failed to load {}: {e}", path.display())))?
    } else {
        log::warn!("No config at {}; using defaults", path.display());
        Config::default()
    };
    config.apply_env();
    config.validate()?;
    Ok(config)
}
