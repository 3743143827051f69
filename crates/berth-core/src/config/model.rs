//! Configuration data structures

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::defaults;

/// Top-level orchestrator configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BerthConfig {
    /// Ledger database
    pub database: DatabaseConfig,
    /// Container runtime
    pub container: ContainerSettings,
    /// Activation health polling
    pub health: HealthSettings,
    /// Logging
    pub logging: LoggingConfig,
    /// Lifecycle event publication
    pub events: EventsConfig,
}

/// Database configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file path, or `:memory:`
    pub path: PathBuf,
    /// How long a writer waits on a locked database
    #[serde(with = "humantime_serde")]
    pub busy_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(defaults::DATABASE_PATH),
            busy_timeout: defaults::busy_timeout(),
        }
    }
}

impl DatabaseConfig {
    /// In-memory database config
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::from(":memory:"),
            ..Self::default()
        }
    }
}

/// Which container adapter to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerBackend {
    /// Docker engine through the docker CLI
    #[default]
    Docker,
    /// No runtime; every plugin reports healthy
    Noop,
}

impl std::str::FromStr for ContainerBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "docker" => Ok(Self::Docker),
            "noop" | "none" => Ok(Self::Noop),
            other => Err(format!("unknown container backend: {}", other)),
        }
    }
}

/// Container runtime settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerSettings {
    /// Adapter backend
    pub backend: ContainerBackend,
    /// Docker executable
    pub docker_binary: String,
    /// User-defined network every plugin container joins
    pub network: String,
    /// Memory limit applied when the manifest declares none (e.g. "512m")
    pub default_memory: Option<String>,
    /// CPU limit applied when the manifest declares none
    pub default_cpu: Option<f64>,
}

impl Default for ContainerSettings {
    fn default() -> Self {
        Self {
            backend: ContainerBackend::default(),
            docker_binary: defaults::DOCKER_BINARY.to_string(),
            network: defaults::PLUGIN_NETWORK.to_string(),
            default_memory: None,
            default_cpu: None,
        }
    }
}

/// Health polling during activation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthSettings {
    /// Delay between health probes
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Give up (and stop the container) after this long
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            poll_interval: defaults::health_poll_interval(),
            timeout: defaults::health_timeout(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when RUST_LOG is unset (trace, debug, info, warn, error)
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

/// Event bus settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Broadcast buffer size; slow subscribers lose events beyond it
    pub capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: defaults::EVENT_CAPACITY,
        }
    }
}
