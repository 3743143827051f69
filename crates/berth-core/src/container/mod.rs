//! Container runtime abstraction
//!
//! One container per plugin, shared by every tenant that enabled it. The
//! orchestrator only talks to [`ContainerAdapter`]; the docker and no-op
//! backends live in submodules.

mod config;
mod docker;
mod health;
mod noop;

pub use config::ContainerConfig;
pub use docker::{CommandOutput, DockerCli, DockerContainerAdapter, DockerRunner};
pub use health::{HealthPolicy, wait_until_healthy};
pub use noop::NoopContainerAdapter;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BerthResult;

/// Health as reported by the container runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    /// Running but the runtime has not finished its first probe
    Starting,
}

impl HealthStatus {
    pub fn is_healthy(self) -> bool {
        matches!(self, Self::Healthy)
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Unhealthy => write!(f, "unhealthy"),
            Self::Starting => write!(f, "starting"),
        }
    }
}

/// Name of the container backing a plugin
pub fn container_name(plugin_id: &str) -> String {
    format!("berth-plugin-{}", plugin_id)
}

/// Start, stop, remove and probe plugin containers.
///
/// Implementations must be idempotent: starting a running container, stopping
/// a stopped one and removing a missing one all succeed.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContainerAdapter: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    /// Ensure the plugin container exists and is running
    async fn start(&self, plugin_id: &str, config: &ContainerConfig) -> BerthResult<()>;

    /// Stop the plugin container
    async fn stop(&self, plugin_id: &str) -> BerthResult<()>;

    /// Remove the plugin container
    async fn remove(&self, plugin_id: &str) -> BerthResult<()>;

    /// Probe health; runtime failures report [`HealthStatus::Unhealthy`]
    async fn health(&self, plugin_id: &str) -> HealthStatus;
}
