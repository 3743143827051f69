//! File-based configuration loading

use std::fs;
use std::path::Path;

use super::model::BerthConfig;
use crate::error::{BerthError, BerthResult};

/// Load configuration from a file
///
/// Supports JSON, TOML, and YAML formats based on file extension.
/// Returns default config if file doesn't exist.
pub fn load_from_file(path: &Path) -> BerthResult<BerthConfig> {
    if !path.exists() {
        tracing::debug!("Config file {} not found, using defaults", path.display());
        return Ok(BerthConfig::default());
    }

    let content = fs::read_to_string(path).map_err(|e| {
        BerthError::config(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;

    let config = match path.extension().and_then(|s| s.to_str()) {
        Some("toml") => toml::from_str(&content).map_err(|e| {
            BerthError::config(format!(
                "Failed to parse TOML config '{}': {}",
                path.display(),
                e
            ))
        })?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content).map_err(|e| {
            BerthError::config(format!(
                "Failed to parse YAML config '{}': {}",
                path.display(),
                e
            ))
        })?,
        _ => serde_json::from_str(&content).map_err(|e| {
            BerthError::config(format!(
                "Failed to parse JSON config '{}': {}",
                path.display(),
                e
            ))
        })?,
    };

    Ok(config)
}
