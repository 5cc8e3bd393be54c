//! On-disk CLI configuration (`~/.ac/config.yaml`).
//!
//! The file is read on every call and never cached, so concurrent CLI
//! invocations editing it always observe each other's writes.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AceError, Result};

pub const DEFAULT_FABRIC_URL: &str = "https://aceteam.ai";

const CONFIG_DIR_ENV: &str = "ACETEAM_CONFIG_DIR";
const API_KEY_ENV: &str = "ACETEAM_API_KEY";
const API_URL_ENV: &str = "ACETEAM_API_URL";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Explicit interpreter to use instead of discovery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub python_path: Option<PathBuf>,

    /// Managed environment created by `aceteam init`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venv_dir: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,

    #[serde(default)]
    pub fabric: FabricConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FabricConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Config {
    /// Fabric base URL: `ACETEAM_API_URL`, then the config file, then the default.
    pub fn fabric_api_url(&self) -> String {
        std::env::var(API_URL_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| self.fabric.api_url.clone())
            .unwrap_or_else(|| DEFAULT_FABRIC_URL.to_string())
    }

    /// Fabric API key: `ACETEAM_API_KEY`, then the config file.
    pub fn fabric_api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| self.fabric.api_key.clone())
    }
}

/// `$ACETEAM_CONFIG_DIR`, or `~/.ac`.
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    dirs::home_dir().unwrap_or_default().join(".ac")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.yaml")
}

/// Where `aceteam init` creates the managed environment by default.
pub fn default_venv_dir() -> PathBuf {
    config_dir().join("venv")
}

pub fn load_config() -> Result<Config> {
    load_from(&config_path())
}

pub fn save_config(config: &Config) -> Result<()> {
    save_to(config, &config_path())
}

/// Load a config file; a missing or empty file yields the defaults.
pub fn load_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yaml::from_str(&content)
        .map_err(|e| AceError::Config(format!("{}: {}", path.display(), e)))
}

pub fn save_to(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_yaml::to_string(config)?;
    std::fs::write(path, content)?;
    tracing::debug!("[Config] Saved {}", path.display());
    Ok(())
}
