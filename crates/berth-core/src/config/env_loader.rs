//! Environment variable overrides

use std::path::PathBuf;

use super::model::BerthConfig;
use crate::error::{BerthError, BerthResult};

/// Apply `BERTH_*` environment overrides on top of a loaded config
pub fn apply_env_overrides(config: &mut BerthConfig) -> BerthResult<()> {
    apply_overrides_from(config, |key| std::env::var(key).ok())
}

/// Apply overrides from an arbitrary variable lookup
pub fn apply_overrides_from(
    config: &mut BerthConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> BerthResult<()> {
    if let Some(path) = lookup("BERTH_DATABASE_PATH") {
        config.database.path = PathBuf::from(path);
    }

    if let Some(backend) = lookup("BERTH_CONTAINER_BACKEND") {
        config.container.backend = backend
            .parse()
            .map_err(|e: String| BerthError::config(format!("Invalid BERTH_CONTAINER_BACKEND: {}", e)))?;
    }

    if let Some(network) = lookup("BERTH_CONTAINER_NETWORK") {
        config.container.network = network;
    }

    if let Some(level) = lookup("BERTH_LOG_LEVEL") {
        config.logging.level = level;
    }

    Ok(())
}
