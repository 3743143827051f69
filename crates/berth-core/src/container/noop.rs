//! Container adapter for environments without a runtime

use async_trait::async_trait;

use super::{ContainerAdapter, ContainerConfig, HealthStatus};
use crate::error::BerthResult;

/// Accepts every request and reports every plugin healthy
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopContainerAdapter;

impl NoopContainerAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ContainerAdapter for NoopContainerAdapter {
    fn name(&self) -> &'static str {
        "noop"
    }

    async fn start(&self, plugin_id: &str, config: &ContainerConfig) -> BerthResult<()> {
        tracing::debug!(plugin_id, image = %config.image, "noop start");
        Ok(())
    }

    async fn stop(&self, plugin_id: &str) -> BerthResult<()> {
        tracing::debug!(plugin_id, "noop stop");
        Ok(())
    }

    async fn remove(&self, plugin_id: &str) -> BerthResult<()> {
        tracing::debug!(plugin_id, "noop remove");
        Ok(())
    }

    async fn health(&self, _plugin_id: &str) -> HealthStatus {
        HealthStatus::Healthy
    }
}
