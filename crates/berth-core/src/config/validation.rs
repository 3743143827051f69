//! Configuration validation

use super::model::BerthConfig;
use crate::error::{BerthError, BerthResult};

/// Validate a fully merged configuration
pub fn validate_config(config: &BerthConfig) -> BerthResult<()> {
    let mut errors = Vec::new();

    if config.database.path.as_os_str().is_empty() {
        errors.push("database.path cannot be empty".to_string());
    }

    if config.health.poll_interval.is_zero() {
        errors.push("health.poll_interval must be greater than zero".to_string());
    }
    if config.health.timeout < config.health.poll_interval {
        errors.push("health.timeout must not be shorter than health.poll_interval".to_string());
    }

    if config.container.network.trim().is_empty() {
        errors.push("container.network cannot be empty".to_string());
    } else if config.container.network == "host" {
        errors.push("container.network cannot be the host network".to_string());
    }

    if let Some(cpu) = config.container.default_cpu {
        if cpu <= 0.0 {
            errors.push("container.default_cpu must be positive".to_string());
        }
    }

    if config.events.capacity == 0 {
        errors.push("events.capacity must be greater than zero".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(BerthError::config(errors.join("; ")))
    }
}
