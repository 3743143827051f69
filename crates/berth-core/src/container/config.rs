//! Container configuration derived from the plugin manifest

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::ContainerSettings;
use crate::plugins::{HealthCheckSpec, PluginManifest, ResourceLimits};

/// Everything the runtime needs to create a plugin container
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerConfig {
    /// Image reference
    pub image: String,
    /// Environment, including `PLUGIN_ID` and `PLUGIN_VERSION`
    pub env: BTreeMap<String, String>,
    /// Ports exposed on the plugin network
    pub ports: Vec<u16>,
    /// Resource limits after applying defaults
    pub resources: ResourceLimits,
    /// Runtime health check
    pub health_check: Option<HealthCheckSpec>,
    /// Network to join
    pub network: String,
}

impl ContainerConfig {
    /// Minimal config for an image
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            env: BTreeMap::new(),
            ports: Vec::new(),
            resources: ResourceLimits::default(),
            health_check: None,
            network: crate::config::defaults::PLUGIN_NETWORK.to_string(),
        }
    }

    /// Build the container config for a plugin.
    ///
    /// Manifest resource limits win over the configured defaults; the plugin
    /// identity variables cannot be overridden by the manifest.
    pub fn from_manifest(manifest: &PluginManifest, settings: &ContainerSettings) -> Self {
        let runtime = &manifest.runtime;

        let mut env = runtime.env.clone();
        env.insert("PLUGIN_ID".to_string(), manifest.id.clone());
        env.insert("PLUGIN_VERSION".to_string(), manifest.version.clone());

        let declared = runtime.resources.clone().unwrap_or_default();
        let resources = ResourceLimits {
            memory: declared.memory.or_else(|| settings.default_memory.clone()),
            cpu: declared.cpu.or(settings.default_cpu),
        };

        Self {
            image: manifest.runtime_image(),
            env,
            ports: runtime.ports.clone(),
            resources,
            health_check: runtime.health_check.clone(),
            network: settings.network.clone(),
        }
    }
}
