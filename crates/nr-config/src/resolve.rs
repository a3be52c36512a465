//! Config file path discovery.
//!
//! Resolution order: CLI argument → environment variables → working
//! directory → XDG config directory.

use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Where the config file was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided via CLI argument.
    CliArgument,
    /// Set via environment variable.
    Environment,
    /// `config.json` in the current working directory.
    WorkingDirectory,
    /// Found in XDG config directory.
    XdgConfig,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::WorkingDirectory => write!(f, "working directory"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
        }
    }
}

/// A located config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub path: PathBuf,
    pub source: ConfigSource,
}

/// Environment variable names.
pub const ENV_CONFIG_PATH: &str = "NIGHTLY_REPORT_CONFIG";
pub const ENV_CONFIG_DIR: &str = "NIGHTLY_REPORT_CONFIG_DIR";

/// Standard config file name.
pub const CONFIG_FILENAME: &str = "config.json";

/// Application name for XDG directories.
const APP_NAME: &str = "nightly-report";

/// Locate the config file.
///
/// An explicit CLI path is authoritative: if it does not exist the search
/// stops there rather than silently falling back to another file.
pub fn resolve_config_path(cli_path: Option<&Path>) -> Result<ResolvedPath, ConfigError> {
    let mut searched = Vec::new();

    // 1. CLI argument
    if let Some(path) = cli_path {
        if path.is_file() {
            return Ok(found(path.to_path_buf(), ConfigSource::CliArgument));
        }
        return Err(ConfigError::NotFound {
            searched: path.display().to_string(),
        });
    }

    // 2. Environment variable (direct path)
    if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
        let path = PathBuf::from(env_path);
        if path.is_file() {
            return Ok(found(path, ConfigSource::Environment));
        }
        searched.push(path);
    }

    // 3. Environment variable (config dir)
    if let Ok(config_dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = PathBuf::from(config_dir).join(CONFIG_FILENAME);
        if path.is_file() {
            return Ok(found(path, ConfigSource::Environment));
        }
        searched.push(path);
    }

    // 4. Working directory
    let local = PathBuf::from(CONFIG_FILENAME);
    if local.is_file() {
        return Ok(found(local, ConfigSource::WorkingDirectory));
    }
    searched.push(local);

    // 5. XDG config directory
    if let Some(xdg_config) = dirs::config_dir() {
        let path = xdg_config.join(APP_NAME).join(CONFIG_FILENAME);
        if path.is_file() {
            return Ok(found(path, ConfigSource::XdgConfig));
        }
        searched.push(path);
    }

    Err(ConfigError::NotFound {
        searched: searched
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", "),
    })
}

fn found(path: PathBuf, source: ConfigSource) -> ResolvedPath {
    tracing::debug!(path = %path.display(), %source, "Resolved config file");
    ResolvedPath { path, source }
}
