use serde_json::Value;

use super::Orchestrator;
use crate::error::BerthResult;
use crate::events::LifecycleEvent;
use crate::ledger::{InstalledPlugin, TenantInstallation};

impl Orchestrator {
    /// Give a tenant access to a plugin that is already running.
    ///
    /// Never starts the container or changes the global status.
    pub async fn enable_for_tenant(&self, tenant_id: &str, plugin_id: &str) -> BerthResult<TenantInstallation> {
        let _guard = self.locks.acquire(plugin_id).await;
        let installation = self
            .ledger
            .enable_for_tenant(tenant_id, plugin_id)
            .map_err(|e| e.in_operation("enable_for_tenant", plugin_id))?;

        self.events.notify(LifecycleEvent::TenantEnabled {
            tenant_id: tenant_id.to_string(),
            plugin_id: plugin_id.to_string(),
        });
        tracing::info!(tenant_id, plugin_id, operation = "enable_for_tenant", "Tenant enabled");
        Ok(installation)
    }

    /// Withdraw a tenant's access without stopping the shared container.
    ///
    /// The last enabled tenant must use [`Orchestrator::deactivate`].
    pub async fn disable_for_tenant(&self, tenant_id: &str, plugin_id: &str) -> BerthResult<TenantInstallation> {
        let _guard = self.locks.acquire(plugin_id).await;
        let installation = self
            .ledger
            .disable_for_tenant(tenant_id, plugin_id)
            .map_err(|e| e.in_operation("disable_for_tenant", plugin_id))?;

        self.events.notify(LifecycleEvent::TenantDisabled {
            tenant_id: tenant_id.to_string(),
            plugin_id: plugin_id.to_string(),
        });
        tracing::info!(tenant_id, plugin_id, operation = "disable_for_tenant", "Tenant disabled");
        Ok(installation)
    }

    /// Replace a tenant's plugin configuration
    pub fn update_configuration(
        &self,
        tenant_id: &str,
        plugin_id: &str,
        configuration: Value,
    ) -> BerthResult<TenantInstallation> {
        self.ledger
            .update_configuration(tenant_id, plugin_id, configuration)
            .map_err(|e| e.in_operation("update_configuration", plugin_id))
    }

    /// A tenant's installations, oldest first
    pub fn get_installed_plugins(&self, tenant_id: &str) -> BerthResult<Vec<InstalledPlugin>> {
        self.ledger.installed_plugins(tenant_id)
    }
}
