//! Command implementations for the lumber CLI

pub mod query;
pub mod serve;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lumber_config::Config;
use tracing::info;

/// Load configuration
///
/// An explicit path must exist. Without one, the default locations are
/// tried in order and the built-in defaults are used when none exists.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path {
        if !path.exists() {
            anyhow::bail!("config file not found: {}", path.display());
        }
        return Config::from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()));
    }

    let default_paths = [
        PathBuf::from("configs/lumber.toml"),
        PathBuf::from("lumber.toml"),
    ];
    for path in &default_paths {
        if path.exists() {
            info!(config = %path.display(), "using config file");
            return Config::from_file(path).context("failed to load configuration");
        }
    }

    Ok(Config::default())
}
