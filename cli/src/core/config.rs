//! # arcshim Configuration System
//!
//! File: cli/src/core/config.rs
//! Author: Christi Mahu
//! Repository: https://github.com/christimahu/arcshim
//!
//! ## Overview
//!
//! This module loads, merges and validates the arcshim configuration. The
//! configuration controls how the execution engine looks for host binaries and
//! where it stages archives that are streamed to standard output.
//!
//! ## Architecture
//!
//! Configuration sources (in order of precedence):
//! 1. `ARCSHIM_CONFIG=<path>`, which replaces the search below entirely
//! 2. Project-specific `.arcshim.toml` in the current directory or ancestors
//! 3. User-specific `config.toml` in the platform config dir (`~/.config/arcshim` on Linux)
//! 4. Default values defined in the code
//!
//! Paths are tilde-expanded and the merged configuration is validated before use.
//!
//! ## Examples
//!
//! ```toml
//! [host]
//! enabled = true
//! search_path = ["~/bin"]
//!
//! [staging]
//! temp_dir = "~/tmp"
//! ```
//!
//! ```rust
//! # fn main() -> arcshim::core::error::Result<()> {
//! let cfg = arcshim::core::config::load_config()?;
//! let prefer_host = cfg.host.enabled;
//! # Ok(())
//! # }
//! ```
//!
use crate::core::error::{Result, ShimError};
use anyhow::{anyhow, Context};
use directories::ProjectDirs;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

/// Represents the main configuration structure, loaded from TOML files.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub staging: StagingConfig,
}

/// Controls lookup and use of real archive binaries installed on the host.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    /// Try the host binary before the embedded engine (defaults to true).
    #[serde(default = "default_host_enabled")]
    pub enabled: bool,
    /// Extra directories searched before `PATH` (can use ~). Will be expanded.
    #[serde(default)]
    pub search_path: Vec<String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            enabled: default_host_enabled(),
            search_path: Vec::new(),
        }
    }
}

/// Where temporary archives destined for standard output are written.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StagingConfig {
    /// Staging directory (can use ~). `None` means the system temp directory.
    pub temp_dir: Option<String>,
}

fn default_host_enabled() -> bool {
    true
}

const PROJECT_CONFIG_FILENAME: &str = ".arcshim.toml";
const CONFIG_ENV_VAR: &str = "ARCSHIM_CONFIG";

pub fn load_config() -> Result<Config> {
    let mut merged_config = match std::env::var_os(CONFIG_ENV_VAR) {
        Some(path) => {
            let path = PathBuf::from(path);
            info!(
                "Loading configuration from {}: {}",
                CONFIG_ENV_VAR,
                path.display()
            );
            load_config_from_path(&path)?
        }
        None => {
            let user_config = load_user_config()?;
            let project_config = load_project_config()?;
            merge_configs(user_config.unwrap_or_default(), project_config)
        }
    };
    expand_config_paths(&mut merged_config).context("Failed to expand paths in configuration")?;
    validate_config(&merged_config).context("Configuration validation failed")?;
    debug!("Final loaded configuration: {:?}", merged_config);
    Ok(merged_config)
}

fn load_user_config() -> Result<Option<Config>> {
    if let Some(proj_dirs) = ProjectDirs::from("com", "arcshim", "arcshim") {
        let config_path = proj_dirs.config_dir().join("config.toml");
        if config_path.exists() {
            info!("Loading user configuration from: {}", config_path.display());
            load_config_from_path(&config_path).map(Some)
        } else {
            debug!(
                "User configuration file not found at {}",
                config_path.display()
            );
            Ok(None)
        }
    } else {
        warn!("Could not determine user config directory.");
        Ok(None)
    }
}

fn load_project_config() -> Result<Option<Config>> {
    if let Some(project_config_path) = find_project_config_path()? {
        info!(
            "Loading project configuration from: {}",
            project_config_path.display()
        );
        load_config_from_path(&project_config_path).map(Some)
    } else {
        debug!("No project configuration file (.arcshim.toml) found in current directory or ancestors.");
        Ok(None)
    }
}

fn find_project_config_path() -> Result<Option<PathBuf>> {
    let current_dir = std::env::current_dir().context("Failed to get current directory")?;
    let mut path: &Path = &current_dir;
    loop {
        let project_config = path.join(PROJECT_CONFIG_FILENAME);
        if project_config.is_file() {
            return Ok(Some(project_config));
        }
        if path.join(".git").is_dir() {
            debug!(
                "Found .git directory at {}, stopping project config search.",
                path.display()
            );
            return Ok(None);
        }
        match path.parent() {
            Some(parent) => path = parent,
            None => break,
        }
    }
    Ok(None)
}

fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse TOML from file: {}", path.display()))
}

/// Project values win wherever they differ from the defaults.
fn merge_configs(user: Config, project: Option<Config>) -> Config {
    let project_cfg = match project {
        Some(p) => p,
        None => return user,
    };
    let mut merged = Config::default();
    merged.host.enabled = if project_cfg.host.enabled != default_host_enabled() {
        project_cfg.host.enabled
    } else {
        user.host.enabled
    };
    merged.host.search_path = if !project_cfg.host.search_path.is_empty() {
        project_cfg.host.search_path
    } else {
        user.host.search_path
    };
    merged.staging.temp_dir = project_cfg.staging.temp_dir.or(user.staging.temp_dir);
    merged
}

fn expand_config_paths(config: &mut Config) -> Result<()> {
    debug!("Expanding paths in configuration...");
    for dir in &mut config.host.search_path {
        *dir = shellexpand::tilde(dir).into_owned();
        debug!("Expanded host search path entry: {}", dir);
    }
    if let Some(temp_dir) = config.staging.temp_dir.as_mut() {
        *temp_dir = shellexpand::tilde(temp_dir).into_owned();
        debug!("Expanded staging directory: {}", temp_dir);
    }
    Ok(())
}

fn validate_config(config: &Config) -> Result<()> {
    debug!("Validating final configuration...");
    if config.host.search_path.iter().any(|dir| dir.trim().is_empty()) {
        return Err(anyhow!(ShimError::Config(
            "host.search_path cannot contain empty entries.".to_string()
        )));
    }
    if let Some(temp_dir) = &config.staging.temp_dir {
        let dir = Path::new(temp_dir);
        if !dir.exists() {
            warn!(
                "Configured staging directory '{}' does not exist; the system temp directory will be used.",
                dir.display()
            );
        } else if !dir.is_dir() {
            return Err(anyhow!(ShimError::Config(format!(
                "Configured staging path '{}' exists but is not a directory.",
                dir.display()
            ))));
        }
    }
    debug!("Configuration validation successful.");
    Ok(())
}
