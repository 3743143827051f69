//! Orchestrator configuration
//!
//! Configuration is read from a JSON, TOML or YAML file (chosen by extension),
//! then environment overrides are applied, then the result is validated.

pub mod defaults;
mod env_loader;
mod file_loader;
mod model;
mod validation;

pub use env_loader::{apply_env_overrides, apply_overrides_from};
pub use file_loader::load_from_file;
pub use model::{
    BerthConfig, ContainerBackend, ContainerSettings, DatabaseConfig, EventsConfig,
    HealthSettings, LogFormat, LoggingConfig,
};
pub use validation::validate_config;

use crate::error::BerthResult;
use std::path::Path;

/// Load configuration from an optional file plus environment overrides
pub fn load_config(path: Option<&Path>) -> BerthResult<BerthConfig> {
    let mut config = match path {
        Some(path) => load_from_file(path)?,
        None => BerthConfig::default(),
    };
    apply_env_overrides(&mut config)?;
    validate_config(&config)?;
    Ok(config)
}
