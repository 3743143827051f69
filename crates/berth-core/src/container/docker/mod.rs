//! Docker backend
//!
//! Drives the docker CLI: one container per plugin, named
//! `berth-plugin-<id>`, labelled with the plugin id and attached to the
//! plugin network. Every operation is idempotent with respect to the current
//! container state.

mod runner;

#[cfg(test)]
mod tests;

pub use runner::{CommandOutput, DockerCli, DockerRunner};

#[cfg(test)]
pub(crate) use runner::MockDockerRunner;

use async_trait::async_trait;
use serde::Deserialize;

use super::{ContainerAdapter, ContainerConfig, HealthStatus, container_name};
use crate::config::ContainerSettings;
use crate::error::{BerthError, BerthResult};

/// Label carrying the plugin id on every managed container
pub const PLUGIN_LABEL: &str = "berth.plugin";

/// stderr fragments docker prints when the requested end state already holds
const ALREADY_DONE: [&str; 4] = [
    "No such container",
    "No such object",
    "is not running",
    "already stopped",
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContainerState {
    #[serde(default)]
    running: bool,
    #[serde(default)]
    status: String,
    #[serde(default)]
    health: Option<ContainerHealth>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContainerHealth {
    status: String,
}

impl ContainerState {
    fn health_status(&self) -> HealthStatus {
        match &self.health {
            Some(health) => match health.status.as_str() {
                "healthy" => HealthStatus::Healthy,
                "starting" => HealthStatus::Starting,
                _ => HealthStatus::Unhealthy,
            },
            // No health check configured: running is as good as it gets.
            None if self.running => HealthStatus::Healthy,
            None => HealthStatus::Unhealthy,
        }
    }
}

/// Container adapter backed by the docker CLI
#[derive(Debug, Clone)]
pub struct DockerContainerAdapter<R: DockerRunner = DockerCli> {
    runner: R,
}

impl DockerContainerAdapter<DockerCli> {
    /// Adapter running the configured docker binary
    pub fn new(settings: &ContainerSettings) -> Self {
        Self::with_runner(DockerCli::new(&settings.docker_binary))
    }
}

impl<R: DockerRunner> DockerContainerAdapter<R> {
    /// Adapter with a custom runner
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }

    async fn docker(
        &self,
        operation: &'static str,
        plugin_id: &str,
        args: &[&str],
    ) -> BerthResult<CommandOutput> {
        self.runner
            .run(args.iter().map(|arg| arg.to_string()).collect())
            .await
            .map_err(|e| BerthError::container(operation, plugin_id, e.to_string()))
    }

    async fn ensure_network(&self, plugin_id: &str, network: &str) -> BerthResult<()> {
        let inspect = self
            .docker("start", plugin_id, &["network", "inspect", network])
            .await?;
        if inspect.success {
            return Ok(());
        }

        tracing::info!("Creating plugin network {}", network);
        let create = self
            .docker(
                "start",
                plugin_id,
                &["network", "create", "--driver", "bridge", network],
            )
            .await?;
        // Lost a race with another activation; the network exists either way.
        if create.success || create.stderr.contains("already exists") {
            Ok(())
        } else {
            Err(BerthError::container("start", plugin_id, create.stderr))
        }
    }

    async fn ensure_image(&self, plugin_id: &str, image: &str) -> BerthResult<()> {
        let inspect = self
            .docker("start", plugin_id, &["image", "inspect", image])
            .await?;
        if inspect.success {
            return Ok(());
        }

        tracing::info!(plugin_id, image, "Pulling plugin image");
        let pull = self.docker("start", plugin_id, &["pull", image]).await?;
        if pull.success {
            Ok(())
        } else {
            Err(BerthError::container(
                "start",
                plugin_id,
                format!("failed to pull image {}: {}", image, pull.stderr),
            ))
        }
    }

    async fn state(&self, plugin_id: &str) -> BerthResult<Option<ContainerState>> {
        let name = container_name(plugin_id);
        let output = self
            .docker(
                "inspect",
                plugin_id,
                &["inspect", "--type", "container", "--format", "{{json .State}}", &name],
            )
            .await?;

        if !output.success {
            if is_already_done(&output.stderr) {
                return Ok(None);
            }
            return Err(BerthError::container("inspect", plugin_id, output.stderr));
        }

        serde_json::from_str(&output.stdout)
            .map(Some)
            .map_err(|e| BerthError::container("inspect", plugin_id, e.to_string()))
    }

    fn run_args(&self, plugin_id: &str, config: &ContainerConfig) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "-d".to_string(),
            "--name".to_string(),
            container_name(plugin_id),
            "--label".to_string(),
            format!("{}={}", PLUGIN_LABEL, plugin_id),
            "--restart".to_string(),
            "unless-stopped".to_string(),
        ];

        if !config.network.is_empty() {
            args.push("--network".to_string());
            args.push(config.network.clone());
        }

        for (key, value) in &config.env {
            args.push("-e".to_string());
            args.push(format!("{}={}", key, value));
        }

        for port in &config.ports {
            args.push("--expose".to_string());
            args.push(port.to_string());
        }

        if let Some(memory) = &config.resources.memory {
            args.push("--memory".to_string());
            args.push(memory.clone());
        }
        if let Some(cpu) = config.resources.cpu {
            args.push("--cpus".to_string());
            args.push(cpu.to_string());
        }

        if let Some(check) = &config.health_check {
            args.push("--health-cmd".to_string());
            args.push(check.command.clone());
            args.push("--health-interval".to_string());
            args.push(format!("{}s", check.interval_secs));
            args.push("--health-retries".to_string());
            args.push(check.retries.to_string());
        }

        args.push(config.image.clone());
        args
    }

    async fn run_container(&self, plugin_id: &str, config: &ContainerConfig) -> BerthResult<()> {
        self.ensure_image(plugin_id, &config.image).await?;

        let args = self.run_args(plugin_id, config);
        let output = self
            .runner
            .run(args)
            .await
            .map_err(|e| BerthError::container("start", plugin_id, e.to_string()))?;
        if !output.success {
            return Err(BerthError::container("start", plugin_id, output.stderr));
        }

        tracing::info!(plugin_id, image = %config.image, "Plugin container created");
        Ok(())
    }
}

#[async_trait]
impl<R: DockerRunner> ContainerAdapter for DockerContainerAdapter<R> {
    fn name(&self) -> &'static str {
        "docker"
    }

    async fn start(&self, plugin_id: &str, config: &ContainerConfig) -> BerthResult<()> {
        if !config.network.is_empty() {
            self.ensure_network(plugin_id, &config.network).await?;
        }

        match self.state(plugin_id).await? {
            Some(state) if state.running => {
                tracing::debug!(plugin_id, "Plugin container already running");
                Ok(())
            }
            Some(state) => {
                tracing::debug!(plugin_id, status = %state.status, "Restarting plugin container");
                let name = container_name(plugin_id);
                let output = self.docker("start", plugin_id, &["start", &name]).await?;
                if output.success {
                    Ok(())
                } else {
                    Err(BerthError::container("start", plugin_id, output.stderr))
                }
            }
            None => self.run_container(plugin_id, config).await,
        }
    }

    async fn stop(&self, plugin_id: &str) -> BerthResult<()> {
        let name = container_name(plugin_id);
        let output = self.docker("stop", plugin_id, &["stop", &name]).await?;
        if output.success || is_already_done(&output.stderr) {
            tracing::debug!(plugin_id, "Plugin container stopped");
            Ok(())
        } else {
            Err(BerthError::container("stop", plugin_id, output.stderr))
        }
    }

    async fn remove(&self, plugin_id: &str) -> BerthResult<()> {
        let name = container_name(plugin_id);
        let output = self.docker("remove", plugin_id, &["rm", "-f", &name]).await?;
        if output.success || is_already_done(&output.stderr) {
            tracing::debug!(plugin_id, "Plugin container removed");
            Ok(())
        } else {
            Err(BerthError::container("remove", plugin_id, output.stderr))
        }
    }

    async fn health(&self, plugin_id: &str) -> HealthStatus {
        match self.state(plugin_id).await {
            Ok(Some(state)) => state.health_status(),
            Ok(None) => HealthStatus::Unhealthy,
            Err(e) => {
                tracing::warn!(plugin_id, error = %e, "Container health probe failed");
                HealthStatus::Unhealthy
            }
        }
    }
}

fn is_already_done(stderr: &str) -> bool {
    ALREADY_DONE.iter().any(|fragment| stderr.contains(fragment))
}
