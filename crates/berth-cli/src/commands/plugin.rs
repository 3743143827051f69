//! Plugin-scoped commands: register, publish, status, recover

use std::path::Path;

use anyhow::{Context, Result};
use berth_core::{HealthStatus, Orchestrator, Plugin};
use serde::Serialize;

/// Plugin state as reported by `berth status`
#[derive(Debug, Serialize)]
pub struct PluginStatus {
    #[serde(flatten)]
    pub plugin: Plugin,
    pub enabled_tenants: u64,
    pub installations: u64,
    pub container_backend: &'static str,
    pub container_health: HealthStatus,
}

/// Read a manifest file
pub fn read_manifest(path: &Path) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Manifest {} is not valid JSON", path.display()))
}

pub async fn register(orchestrator: &Orchestrator, manifest: &Path) -> Result<Plugin> {
    let document = read_manifest(manifest)?;
    Ok(orchestrator.register_plugin(&document).await?)
}

pub fn publish(orchestrator: &Orchestrator, plugin_id: &str) -> Result<Plugin> {
    Ok(orchestrator.publish_plugin(plugin_id)?)
}

pub async fn status(orchestrator: &Orchestrator, plugin_id: &str) -> Result<PluginStatus> {
    let plugin = orchestrator.get_plugin(plugin_id)?;
    let ledger = orchestrator.ledger();
    Ok(PluginStatus {
        enabled_tenants: ledger.count_enabled(plugin_id)?,
        installations: ledger.count_installations(plugin_id)?,
        container_backend: orchestrator.container_backend(),
        container_health: orchestrator.container_health(plugin_id).await?,
        plugin,
    })
}

pub async fn recover(orchestrator: &Orchestrator, plugin_id: &str) -> Result<Plugin> {
    Ok(orchestrator.recover(plugin_id).await?)
}
