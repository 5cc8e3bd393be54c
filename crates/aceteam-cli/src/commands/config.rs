//! `aceteam config show` — print the effective configuration.

use aceteam_core::config::{config_path, load_config, Config};
use serde::Serialize;

use super::CommandResult;

/// What `config show` prints: file values merged with environment overrides.
#[derive(Debug, Serialize)]
pub struct ConfigView {
    pub config_file: String,
    pub python_path: Option<String>,
    pub venv_dir: Option<String>,
    pub default_model: Option<String>,
    pub fabric_api_url: String,
    pub fabric_api_key: Option<String>,
}

impl ConfigView {
    pub fn from_config(config: &Config) -> Self {
        Self {
            config_file: config_path().display().to_string(),
            python_path: config.python_path.as_ref().map(|p| p.display().to_string()),
            venv_dir: config.venv_dir.as_ref().map(|p| p.display().to_string()),
            default_model: config.default_model.clone(),
            fabric_api_url: config.fabric_api_url(),
            fabric_api_key: config.fabric_api_key().map(|k| mask_key(&k)),
        }
    }
}

pub fn show() -> CommandResult {
    let view = ConfigView::from_config(&load_config()?);
    let value = serde_json::to_value(&view).map_err(|e| e.to_string())?;
    super::print_json(&value);
    Ok(())
}

/// Keep only enough of a key to recognize it.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}
