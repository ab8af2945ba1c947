//! Shared CLI utilities.

use anyhow::{Context, Result};
use pplx::config::loader::{default_config_path, Loader};
use pplx::config::ConfigError;
use std::path::PathBuf;

use super::GlobalArgs;

/// Show only the last four characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return String::new();
    }
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

/// File that commands editing the configuration should read and write:
/// `--config`, else the discovered file, else the per-user default location.
pub fn target_config_path(global: &GlobalArgs) -> Result<PathBuf> {
    if let Some(path) = &global.config_file {
        return Ok(path.clone());
    }
    match Loader::new().find_config_file() {
        Ok(path) => Ok(path),
        Err(ConfigError::NoConfigFound { .. }) => {
            default_config_path().context("Cannot determine the config location: HOME is not set")
        }
        Err(e) => Err(e.into()),
    }
}
