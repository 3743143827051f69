use serde_json::Value;

use super::Orchestrator;
use crate::container::HealthStatus;
use crate::error::BerthResult;
use crate::gatekeepers::DependencyEdge;
use crate::plugins::{MarketplaceStatus, Plugin};

impl Orchestrator {
    /// Register (or re-register while REGISTERED) a plugin from its manifest
    /// document, recording its dependency edges.
    pub async fn register_plugin(&self, document: &Value) -> BerthResult<Plugin> {
        let plugin = self.store.register(document)?;
        let edges = DependencyEdge::from_manifest(&plugin.manifest);
        self.dependencies
            .register_dependencies(&plugin.id, &edges)
            .await
            .map_err(|e| e.in_operation("register", &plugin.id))?;
        Ok(plugin)
    }

    /// Record a marketplace review decision
    pub fn set_marketplace_status(&self, plugin_id: &str, status: MarketplaceStatus) -> BerthResult<Plugin> {
        self.store
            .set_marketplace_status(plugin_id, status)
            .map_err(|e| e.in_operation("set_marketplace_status", plugin_id))
    }

    /// Shorthand for approving a plugin for installation
    pub fn publish_plugin(&self, plugin_id: &str) -> BerthResult<Plugin> {
        self.set_marketplace_status(plugin_id, MarketplaceStatus::Published)
    }

    pub fn get_plugin(&self, plugin_id: &str) -> BerthResult<Plugin> {
        self.store.get(plugin_id)
    }

    pub fn list_plugins(&self) -> BerthResult<Vec<Plugin>> {
        self.store.list()
    }

    /// Current container health of a known plugin
    pub async fn container_health(&self, plugin_id: &str) -> BerthResult<HealthStatus> {
        self.store.get(plugin_id)?;
        Ok(self.container.health(plugin_id).await)
    }

    /// Return a retired or orphaned plugin to REGISTERED
    pub async fn recover(&self, plugin_id: &str) -> BerthResult<Plugin> {
        let _guard = self.locks.acquire(plugin_id).await;
        let changes = self
            .ledger
            .recover(plugin_id)
            .map_err(|e| e.in_operation("recover", plugin_id))?;

        // Nothing may still be running for a plugin without installations.
        if let Err(e) = self.container.remove(plugin_id).await {
            tracing::warn!(plugin_id, operation = "recover", error = %e, "Failed to remove plugin container");
        }

        self.publish_changes(plugin_id, &changes);
        tracing::info!(plugin_id, operation = "recover", "Plugin recovered");
        self.store.get(plugin_id)
    }
}
